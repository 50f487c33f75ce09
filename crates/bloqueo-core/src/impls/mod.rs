//! Impls - BlobStore adapters.
//!
//! - **InMemoryBlobStore**: tests and throwaway runs
//! - **LocalBlobStore**: a directory acting as the blob container

pub mod local_blob;
pub mod memory_blob;

pub use self::local_blob::LocalBlobStore;
pub use self::memory_blob::InMemoryBlobStore;
