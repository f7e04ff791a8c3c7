//! Remote side of the mirror: draining a bucket listing into a snapshot.

use futures::StreamExt;
use indicatif::DecimalBytes;
use tracing::{debug, info};

use crate::contract::ObjectStore;
use crate::error::{MirrorError, Result};

/// Substring marking MinIO's internal temporary objects.
pub const TEMP_OBJECT_MARKER: &str = "minio.sys.tmp";

/// A complete listing of a bucket.
#[derive(Debug, Clone, Default)]
pub struct RemoteListing {
    /// Keys in enumeration order.
    pub keys: Vec<String>,
    /// Sum of the sizes of all listed objects.
    pub total_bytes: u64,
}

/// True for keys that never take part in the comparison.
pub fn is_ignored_key(key: &str) -> bool {
    key.contains(TEMP_OBJECT_MARKER) || key.ends_with('/')
}

/// Lists every object in `bucket`.
///
/// Any per-object error aborts the listing: a partial snapshot would yield a
/// wrong diff.
pub async fn list_remote<S>(store: &S, bucket: &str) -> Result<RemoteListing>
where
    S: ObjectStore + ?Sized,
{
    let mut listing = RemoteListing::default();
    let mut objects = store.list_objects(bucket);

    while let Some(item) = objects.next().await {
        let object = item.map_err(|source| MirrorError::RemoteListing {
            bucket: bucket.to_string(),
            source,
        })?;

        if is_ignored_key(&object.key) {
            debug!(key = %object.key, "Ignoring backend-internal object");
            continue;
        }

        listing.total_bytes += object.size;
        listing.keys.push(object.key);
    }

    info!(
        bucket,
        remote_files = listing.keys.len(),
        remote_size = %DecimalBytes(listing.total_bytes),
        "Listed remote objects"
    );
    Ok(listing)
}
