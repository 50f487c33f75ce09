//! bloqueo-core
//!
//! Core building blocks for the firewall block/unblock task orchestrator.
//!
//! # Modules
//! - **domain**: task records, identifiers, status set, cache entries, errors
//! - **ports**: seams to the outside world (BlobStore, Clock, IdGenerator)
//! - **impls**: in-process BlobStore adapters (in-memory, local directory)
//! - **store**: blob-backed Task Store, advisory lock, final-status cache
//! - **app**: orchestration logic, wiring, periodic cache sweep

pub mod domain;
pub mod ports;
pub mod impls;
pub mod store;
pub mod app;

pub use app::{App, AppBuilder, CacheSweepLoop, Orchestrator};
pub use domain::{BloqueoError, ErrorKind};
