//! rankdb-text
//!
//! Raw text for keyword scoring: a filesystem document source with per-format
//! extraction, the per-slot text cache, and the keyword matching helpers the
//! hybrid scorer is built on.

pub mod cache;
pub mod extract;
pub mod keywords;
pub mod source;

pub use cache::TextCache;
pub use keywords::Keywords;
pub use source::FsDocumentSource;
