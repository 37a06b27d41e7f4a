//! Fixed-layout engine family: kinds, capability contract, probe registry.
//!
//! Concrete engines (PDF, XPS, ...) live outside this crate; they plug in
//! through [`Engine`] and an ordered [`EngineRegistry`] of probes built at
//! process start. Probe order is part of the public contract: the first
//! probe that accepts a file owns it, and a construction failure after
//! acceptance is terminal.

use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::props::DocumentProperty;

/// The fixed-layout formats routed through the generic engine interface.
///
/// The declaration order here is the canonical probe order for a fully
/// populated registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Pdf,
    Xps,
    DjVu,
    Image,
    ImageDir,
    ComicBook,
    PostScript,
    Chm,
    Pdb,
    Chm2,
    Tcr,
    Html,
    Txt,
}

/// Capability contract every fixed-layout engine implements.
///
/// Mirrors the e-book backend surface: a canonical path and metadata
/// lookup. Rendering is out of scope for this crate, so the contract stops
/// there.
pub trait Engine {
    /// The canonical path the engine believes it opened.
    fn file_name(&self) -> &Path;

    /// Metadata lookup; absent keys return `None`, not an error.
    fn property(&self, prop: DocumentProperty) -> Option<String>;
}

/// A registered engine: its kind plus the two static capability functions.
pub struct EngineProbe {
    pub kind: EngineKind,
    /// Pure predicate; bounded I/O when `sniff` is true.
    pub is_supported: fn(&Path, bool) -> bool,
    /// Opens and fully parses the file.
    pub create: fn(&Path) -> Result<Box<dyn Engine>>,
}

/// Ordered, append-only list of engine probes.
///
/// Built once at process start and read-only afterwards; dispatch walks the
/// probes in registration order.
#[derive(Default)]
pub struct EngineRegistry {
    probes: Vec<EngineProbe>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, probe: EngineProbe) {
        self.probes.push(probe);
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// First probe accepting the file at the given sniffing depth.
    pub(crate) fn first_accepting(&self, path: &Path, sniff: bool) -> Option<&EngineProbe> {
        self.probes.iter().find(|p| (p.is_supported)(path, sniff))
    }

    /// First engine kind whose probe accepts the file: one extension pass,
    /// then one sniffing pass.
    pub fn detect(&self, path: &Path) -> Option<EngineKind> {
        for sniff in [false, true] {
            if let Some(probe) = self.first_accepting(path, sniff) {
                return Some(probe.kind);
            }
        }
        None
    }

    /// OR of all probes, like [`detect`](Self::detect) but without
    /// selecting a winner. Sniff mode is a superset of the extension check.
    pub fn is_supported_file(&self, path: &Path, sniff: bool) -> bool {
        self.probes
            .iter()
            .any(|p| (p.is_supported)(path, false) || (sniff && (p.is_supported)(path, true)))
    }

    /// Construct the engine for the first accepting probe.
    ///
    /// Returns `UnsupportedFormat` when no probe accepts; a construction
    /// failure after acceptance is returned as-is (terminal, no fallback).
    pub fn create_engine(&self, path: &Path) -> Result<(EngineKind, Box<dyn Engine>)> {
        for sniff in [false, true] {
            if let Some(probe) = self.first_accepting(path, sniff) {
                debug!(kind = ?probe.kind, sniff, path = %path.display(), "engine probe accepted");
                let engine = (probe.create)(path)?;
                return Ok((probe.kind, engine));
            }
        }
        Err(Error::UnsupportedFormat(path.display().to_string()))
    }
}
