//! App - application layer.
//!
//! # Components
//! - **Orchestrator**: task creation, lookup and status transitions
//! - **AppBuilder**: wiring of ports into an [`Orchestrator`]
//! - **CacheSweepLoop**: periodic removal of expired final-status entries

pub mod builder;
pub mod orchestrator;
pub mod sweep_loop;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::orchestrator::Orchestrator;
pub use self::sweep_loop::CacheSweepLoop;
