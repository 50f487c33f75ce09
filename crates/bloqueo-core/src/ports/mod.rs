//! Ports - seams to external systems.
//!
//! Each trait hides one collaborator so that the store and the orchestrator
//! can be exercised against in-process adapters:
//! - BlobStore: the remote blob container (single source of truth)
//! - Clock: wall-clock time
//! - IdGenerator: task identifier minting

pub mod blob_store;
pub mod clock;
pub mod id_generator;

pub use self::blob_store::BlobStore;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
