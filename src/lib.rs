//! # folio
//!
//! A document abstraction and format-dispatch library: one polymorphic
//! handle type ([`Doc`]) over heterogeneous document backends, plus the
//! detection logic that decides, given only a file path, which backend owns
//! the file.
//!
//! ## Features
//!
//! - Built-in reflowable e-book backends: EPUB, FictionBook2, MOBI
//! - Fixed-layout formats (PDF, XPS, images, ...) plug in through the
//!   [`Engine`] capability contract and an ordered [`EngineRegistry`]
//! - Two-stage detection: cheap extension check, then bounded content
//!   sniffing; first match wins and the probe order is part of the contract
//! - Uniform accessors: file path, metadata properties, decoded content,
//!   embedded cover art
//!
//! ## Quick Start
//!
//! ```no_run
//! use folio::{Doc, DocumentProperty};
//!
//! let doc = Doc::create_from_file("book.epub".as_ref());
//! if doc.is_ebook() {
//!     println!("title: {:?}", doc.property(DocumentProperty::Title));
//!     println!("{} content bytes", doc.html_data().len());
//! } else if let Some(err) = doc.error() {
//!     eprintln!("cannot open: {err}");
//! }
//! ```
//!
//! Loading is synchronous and blocking; each call owns its backend instance
//! and the only shared state is the read-only probe list.

pub mod doc;
pub mod engine;
pub mod epub;
pub mod error;
pub mod fb2;
pub mod mobi;
pub mod props;
pub(crate) mod util;

pub use doc::{Doc, DocKind, EbookKind};
pub use engine::{Engine, EngineKind, EngineProbe, EngineRegistry};
pub use epub::EpubDoc;
pub use error::{Error, LoadError, Result};
pub use fb2::Fb2Doc;
pub use mobi::{MobiDoc, MobiTestDoc};
pub use props::{DocumentProperty, ImageData};
