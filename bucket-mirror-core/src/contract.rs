//! # contract: the object-storage seam
//!
//! This module defines the single trait ([`ObjectStore`]) the reconciliation loop
//! needs from a storage backend, plus the plain data types flowing through it.
//!
//! ## Interface
//! - `list_objects`: flat, recursive enumeration of a bucket as a stream. Each item
//!   is either an [`ObjectInfo`] or a per-object listing error.
//! - `stat_object`: size lookup for one key, used to size the progress bar.
//! - `get_object`: a readable byte stream for one key.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so `MockObjectStore` is available to
//!   tests in this crate and, through the `test-export-mocks` feature, to dependents.
//!
//! ## Adding New Backends
//! - Implement the trait for your client (see the `bucket-mirror` crate for the S3 one).
//! - Convert backend errors into [`StoreError`]; the loop only logs and classifies them.

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::io::AsyncRead;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Error type returned by storage backends. The loop only displays it.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Readable body of a remote object.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Stream of listing results; an `Err` item invalidates the whole listing.
pub type ObjectListing = BoxStream<'static, Result<ObjectInfo, StoreError>>;

/// One entry of a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object key, relative to the bucket.
    pub key: String,
    /// Size in bytes as reported by the listing.
    pub size: u64,
}

/// Metadata fetched right before a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    pub key: String,
    pub size: u64,
}

/// Trait for reading objects out of a bucket.
/// The implementor is responsible for connecting to the backing service.
///
/// The trait is `Send` + `Sync` and intended for async/await usage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Enumerate every object in `bucket`, without delimiter semantics.
    fn list_objects(&self, bucket: &str) -> ObjectListing;

    /// Fetch the metadata of a single object.
    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectStat, StoreError>;

    /// Open a byte stream over a single object.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError>;
}
