//! IdGenerator port - task identifier minting.
//!
//! Abstracted as a trait so tests can pin the clock and still get unique ids.
//!
//! # Implementations
//! - **UlidGenerator**: monotonic ULIDs (production)

use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use tracing::warn;
use ulid::{Generator, Ulid};

use crate::domain::{Tid, Vdom};
use crate::ports::Clock;

/// IdGenerator mints globally unique task identifiers.
///
/// # Thread Safety
/// - requires `Send + Sync` (shared by every request handler)
pub trait IdGenerator: Send + Sync {
    /// Next ULID, strictly greater than every ULID previously returned.
    fn next_ulid(&self) -> Ulid;

    /// `<ulid>-<vdom>`
    fn generate_tid(&self, vdom: &Vdom) -> Tid {
        Tid::compose(self.next_ulid(), vdom)
    }
}

/// UlidGenerator produces monotonic ULIDs from the current clock time.
///
/// Within one millisecond the random part is incremented instead of being
/// redrawn, so ids minted by one process sort in creation order even under
/// a [`crate::ports::FixedClock`].
pub struct UlidGenerator<C> {
    clock: C,
    generator: Mutex<Generator>,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            generator: Mutex::new(Generator::new()),
        }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn next_ulid(&self) -> Ulid {
        let now = self.clock.now();
        let mut generator = self.generator.lock().unwrap_or_else(PoisonError::into_inner);
        match generator.generate_from_datetime(SystemTime::from(now)) {
            Ok(ulid) => ulid,
            Err(err) => {
                // 2^80 ids in one millisecond; fall back to a fresh random part.
                warn!(error = %err, "monotonic ulid overflow");
                Ulid::from_parts(now.timestamp_millis() as u64, rand::random())
            }
        }
    }
}
