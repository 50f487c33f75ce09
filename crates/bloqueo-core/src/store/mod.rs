//! Store - blob-backed persistence.
//!
//! - **TaskStore**: one JSON array of task records per collection blob
//! - **BlobLock**: advisory mutual exclusion on a single blob
//! - **FinalStatusCache**: TTL map of terminal outcomes, guarded by the lock
//!
//! Every operation re-reads the blob it works on; nothing is cached in
//! memory between calls.

mod final_cache;
mod lock;
mod task_store;

pub use self::final_cache::{CacheMap, FINAL_STATUS_BLOB_NAME, FinalStatusCache};
pub use self::lock::{BlobLock, LOCK_BLOB_NAME};
pub use self::task_store::{TaskStore, find_task};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Pretty-printed JSON with a four-space indent; non-ASCII is written as-is.
pub(crate) fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(out)
}
