//! The polymorphic document handle and its format dispatcher.
//!
//! A [`Doc`] owns exactly one backend instance (or none) and exposes a
//! uniform accessor surface over it. Handles are move-only: copying a handle
//! would duplicate the dispatch tag without duplicating backend ownership,
//! so there is no `Clone`; shared access is the caller's `Arc` decision.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::engine::{Engine, EngineKind, EngineRegistry};
use crate::epub::EpubDoc;
use crate::error::{LoadError, Result};
use crate::fb2::Fb2Doc;
use crate::mobi::{MobiDoc, MobiTestDoc};
use crate::props::{DocumentProperty, ImageData};

/// The reflowable e-book formats with dedicated backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EbookKind {
    Epub,
    Fb2,
    Mobi,
    /// Test/tooling backend wrapping raw HTML; never produced by dispatch.
    MobiTest,
}

/// What a [`Doc`] is backed by.
///
/// Every handle is exactly one of these three categories; `None` covers both
/// "not yet loaded" and "load failed" (the failure reason lives in
/// [`Doc::error`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocKind {
    None,
    Ebook(EbookKind),
    Engine(EngineKind),
}

impl DocKind {
    pub fn is_ebook(self) -> bool {
        matches!(self, DocKind::Ebook(_))
    }

    pub fn is_engine(self) -> bool {
        matches!(self, DocKind::Engine(_))
    }

    pub fn is_none(self) -> bool {
        matches!(self, DocKind::None)
    }
}

/// The owned backend instance. The variant is the kind discriminator, so
/// "payload matches kind" holds structurally.
enum Payload {
    None,
    Epub(EpubDoc),
    Fb2(Fb2Doc),
    Mobi(MobiDoc),
    MobiTest(MobiTestDoc),
    Engine(EngineKind, Box<dyn Engine>),
}

/// A document, or the absence/failure thereof.
///
/// Produced by [`Doc::create_from_file`] (format dispatch) or by direct
/// construction from an already-opened backend. Owns its backend instance;
/// [`Doc::close`] releases it and resets the handle to the `None` state.
pub struct Doc {
    payload: Payload,
    /// Set only when the payload is `None`.
    error: Option<LoadError>,
    /// The originally requested path, kept for diagnostics on failed loads.
    override_path: Option<PathBuf>,
}

impl Default for Doc {
    fn default() -> Self {
        Self::none()
    }
}

impl Doc {
    /// An empty handle: no document, no error.
    pub fn none() -> Self {
        Self {
            payload: Payload::None,
            error: None,
            override_path: None,
        }
    }

    pub fn from_epub(doc: EpubDoc) -> Self {
        Self::with_payload(Payload::Epub(doc))
    }

    pub fn from_fb2(doc: Fb2Doc) -> Self {
        Self::with_payload(Payload::Fb2(doc))
    }

    pub fn from_mobi(doc: MobiDoc) -> Self {
        Self::with_payload(Payload::Mobi(doc))
    }

    pub fn from_mobi_test(doc: MobiTestDoc) -> Self {
        Self::with_payload(Payload::MobiTest(doc))
    }

    pub fn from_engine(kind: EngineKind, engine: Box<dyn Engine>) -> Self {
        Self::with_payload(Payload::Engine(kind, engine))
    }

    fn with_payload(payload: Payload) -> Self {
        Self {
            payload,
            error: None,
            override_path: None,
        }
    }

    fn failed(path: &Path, error: LoadError) -> Self {
        Self {
            payload: Payload::None,
            error: Some(error),
            override_path: Some(path.to_path_buf()),
        }
    }

    // --- Format dispatch ---

    /// Open a document, selecting the backend by probing in the fixed order
    /// Epub → Fb2 → Mobi: one cheap extension pass, then one content
    /// sniffing pass.
    ///
    /// Once a probe accepts a file, a construction failure is terminal — no
    /// other backend is tried, and the handle carries
    /// [`LoadError::Backend`]. If no probe accepts, the handle carries
    /// [`LoadError::UnknownFormat`]. Both failure handles preserve the
    /// requested path for diagnostics.
    pub fn create_from_file(path: &Path) -> Doc {
        let doc = Self::dispatch_ebook(path).unwrap_or_else(|| {
            debug!(path = %path.display(), "no backend accepted the file");
            Self::failed(path, LoadError::UnknownFormat)
        });
        // The two public predicates must agree: a supported path never
        // yields the generic unknown-format error.
        debug_assert_eq!(
            Self::is_supported_file(path, true),
            !doc.error.as_ref().is_some_and(LoadError::is_unknown_format),
        );
        doc
    }

    /// Like [`create_from_file`](Self::create_from_file), but probes the
    /// fixed-layout engine registry first, as the full application does.
    pub fn create_with_engines(path: &Path, engines: &EngineRegistry) -> Doc {
        for sniff in [false, true] {
            if let Some(probe) = engines.first_accepting(path, sniff) {
                debug!(kind = ?probe.kind, sniff, path = %path.display(), "engine probe accepted");
                return match (probe.create)(path) {
                    Ok(engine) => Self::from_engine(probe.kind, engine),
                    Err(e) => {
                        warn!(kind = ?probe.kind, error = %e, "engine construction failed");
                        Self::failed(path, LoadError::Backend(e))
                    }
                };
            }
            if let Some(doc) = Self::dispatch_ebook_pass(path, sniff) {
                return doc;
            }
        }
        Self::failed(path, LoadError::UnknownFormat)
    }

    fn dispatch_ebook(path: &Path) -> Option<Doc> {
        for sniff in [false, true] {
            if let Some(doc) = Self::dispatch_ebook_pass(path, sniff) {
                return Some(doc);
            }
        }
        None
    }

    /// One probe pass over the e-book backends at a fixed sniffing depth.
    fn dispatch_ebook_pass(path: &Path, sniff: bool) -> Option<Doc> {
        if EpubDoc::is_supported_file(path, sniff) {
            debug!(sniff, path = %path.display(), "EPUB probe accepted");
            return Some(Self::from_backend(path, EpubDoc::create_from_file(path).map(Payload::Epub)));
        }
        if Fb2Doc::is_supported_file(path, sniff) {
            debug!(sniff, path = %path.display(), "FB2 probe accepted");
            return Some(Self::from_backend(path, Fb2Doc::create_from_file(path).map(Payload::Fb2)));
        }
        if MobiDoc::is_supported_file(path, sniff) {
            debug!(sniff, path = %path.display(), "MOBI probe accepted");
            return Some(Self::from_backend(path, MobiDoc::create_from_file(path).map(Payload::Mobi)));
        }
        None
    }

    fn from_backend(path: &Path, result: Result<Payload>) -> Doc {
        match result {
            Ok(payload) => Self::with_payload(payload),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "backend construction failed");
                Self::failed(path, LoadError::Backend(e))
            }
        }
    }

    /// Whether any e-book backend would accept the file. Sniff mode is a
    /// superset of the extension check, so this agrees with
    /// [`create_from_file`](Self::create_from_file) selecting some backend.
    pub fn is_supported_file(path: &Path, sniff: bool) -> bool {
        backend_supported(path, sniff, EpubDoc::is_supported_file)
            || backend_supported(path, sniff, Fb2Doc::is_supported_file)
            || backend_supported(path, sniff, MobiDoc::is_supported_file)
    }

    /// The kind [`create_from_file`](Self::create_from_file) would select,
    /// without constructing a backend.
    pub fn detect(path: &Path) -> Option<DocKind> {
        for sniff in [false, true] {
            if EpubDoc::is_supported_file(path, sniff) {
                return Some(DocKind::Ebook(EbookKind::Epub));
            }
            if Fb2Doc::is_supported_file(path, sniff) {
                return Some(DocKind::Ebook(EbookKind::Fb2));
            }
            if MobiDoc::is_supported_file(path, sniff) {
                return Some(DocKind::Ebook(EbookKind::Mobi));
            }
        }
        None
    }

    // --- Category predicates ---

    pub fn kind(&self) -> DocKind {
        match &self.payload {
            Payload::None => DocKind::None,
            Payload::Epub(_) => DocKind::Ebook(EbookKind::Epub),
            Payload::Fb2(_) => DocKind::Ebook(EbookKind::Fb2),
            Payload::Mobi(_) => DocKind::Ebook(EbookKind::Mobi),
            Payload::MobiTest(_) => DocKind::Ebook(EbookKind::MobiTest),
            Payload::Engine(kind, _) => DocKind::Engine(*kind),
        }
    }

    /// True for documents handled by the e-book UI.
    pub fn is_ebook(&self) -> bool {
        self.kind().is_ebook()
    }

    pub fn is_engine(&self) -> bool {
        self.kind().is_engine()
    }

    pub fn is_none(&self) -> bool {
        self.kind().is_none()
    }

    /// Why the load failed, when it did.
    pub fn error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    // --- Accessor dispatch ---

    /// The document's file path: the requested path when one was recorded,
    /// otherwise whatever the active backend reports. `None` for an empty
    /// handle or a backend with no file behind it.
    pub fn file_path(&self) -> Option<&Path> {
        if let Some(ref path) = self.override_path {
            // When both exist they must denote the same file.
            debug_assert!(self.path_from_backend().is_none_or(|p| p == path));
            return Some(path);
        }
        self.path_from_backend()
    }

    fn path_from_backend(&self) -> Option<&Path> {
        match &self.payload {
            Payload::Epub(doc) => Some(doc.file_name()),
            Payload::Fb2(doc) => Some(doc.file_name()),
            Payload::Mobi(doc) => Some(doc.file_name()),
            Payload::MobiTest(_) => None,
            Payload::None => None,
            Payload::Engine(_, engine) => Some(engine.file_name()),
        }
    }

    /// Metadata lookup on the active backend. Empty handles and backends
    /// without metadata return `None`.
    pub fn property(&self, prop: DocumentProperty) -> Option<String> {
        match &self.payload {
            Payload::Epub(doc) => doc.property(prop),
            Payload::Fb2(doc) => doc.property(prop),
            Payload::Mobi(doc) => doc.property(prop),
            Payload::MobiTest(_) => None,
            Payload::None => None,
            Payload::Engine(_, engine) => engine.property(prop),
        }
    }

    /// The e-book backend's decoded content.
    ///
    /// # Panics
    ///
    /// Panics when called on a non-ebook handle; callers are expected to
    /// check [`is_ebook`](Self::is_ebook) first, so this is a caller bug,
    /// not a data error.
    pub fn html_data(&self) -> &[u8] {
        match &self.payload {
            Payload::Epub(doc) => doc.html_data(),
            Payload::Fb2(doc) => doc.html_data(),
            Payload::Mobi(doc) => doc.html_data(),
            Payload::MobiTest(doc) => doc.html_data(),
            Payload::None | Payload::Engine(..) => {
                panic!("html_data() called on a non-ebook document")
            }
        }
    }

    /// Embedded cover art, for the backends that carry it (FB2, MOBI).
    /// Uniformly `None` for every other kind — never a failure.
    pub fn cover_image(&self) -> Option<&ImageData> {
        match &self.payload {
            Payload::Fb2(doc) => doc.cover_image(),
            Payload::Mobi(doc) => doc.cover_image(),
            _ => None,
        }
    }

    // --- Variant downcasts ---

    pub fn as_epub(&self) -> Option<&EpubDoc> {
        match &self.payload {
            Payload::Epub(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_fb2(&self) -> Option<&Fb2Doc> {
        match &self.payload {
            Payload::Fb2(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_mobi(&self) -> Option<&MobiDoc> {
        match &self.payload {
            Payload::Mobi(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_mobi_test(&self) -> Option<&MobiTestDoc> {
        match &self.payload {
            Payload::MobiTest(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_engine(&self) -> Option<&dyn Engine> {
        match &self.payload {
            Payload::Engine(_, engine) => Some(engine.as_ref()),
            _ => None,
        }
    }

    // --- Teardown ---

    /// Release the owned backend instance and reset to the `None` state.
    ///
    /// Idempotent: closing an already-empty handle is a no-op, and a closed
    /// handle never transitions back to a loaded state.
    pub fn close(&mut self) {
        self.payload = Payload::None;
        self.error = None;
        self.override_path = None;
    }
}

fn backend_supported(path: &Path, sniff: bool, probe: fn(&Path, bool) -> bool) -> bool {
    probe(path, false) || (sniff && probe(path, true))
}
