//! Foundation types for Tessera, a pluggable blob-storage backend for
//! medical-imaging archives.
//!
//! Every other Tessera crate depends on `tessera-types`.
//!
//! # Key Types
//!
//! - [`BlobId`]: caller-supplied UUID identifying one stored object
//! - [`ContentKind`]: closed set of attachment kinds tracked by the deletion queue
//! - [`LayoutPolicy`]: how much extracted metadata shapes the mount hierarchy

pub mod blob;
pub mod error;
pub mod kind;
pub mod layout;

pub use blob::BlobId;
pub use error::TypeError;
pub use kind::ContentKind;
pub use layout::LayoutPolicy;
