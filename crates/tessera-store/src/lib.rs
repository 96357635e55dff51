//! Content-addressed blob storage for Tessera.
//!
//! Every blob lives at two addresses:
//!
//! - the **canonical address** `root/id[0:2]/id[2:4]/id`, derived purely from
//!   the [`BlobId`](tessera_types::BlobId), and
//! - the **mount address**, chosen once at creation time from content
//!   classification and the configured [`LayoutPolicy`](tessera_types::LayoutPolicy).
//!
//! The bytes are written to the mount address. An indirection record at the
//! canonical address (plus [`INDIRECTION_SUFFIX`]) names the mount address.
//! Reads and removals always dereference the record before acting; when it is
//! absent, the canonical address is assumed to hold the content directly.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`FileSystemStore`] -- the on-disk two-address store
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Identifiers are validated before any I/O.
//! 2. Write-then-link: write content, then write the indirection record.
//! 3. Only transient I/O failures are retried, with a bounded budget.
//! 4. Short range reads are errors, never silently truncated.
//! 5. Empty shard directories are pruned on a best-effort basis.

pub mod address;
pub mod classify;
pub mod config;
pub mod error;
pub mod fs;
pub mod layout;
pub mod memory;
pub mod retry;
pub mod traits;

pub use address::{canonical_path, indirection_path, sharded_path, validate, INDIRECTION_SUFFIX};
pub use classify::{Classification, ContentClassifier, DicomClassifier, NoopClassifier};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use fs::{FileSystemStore, Location};
pub use memory::InMemoryBlobStore;
pub use retry::RetryPolicy;
pub use traits::BlobStore;
