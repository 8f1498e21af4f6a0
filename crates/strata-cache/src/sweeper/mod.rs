//! Background eviction of dormant entries.
//!
//! One [`DormantSweeper`] is built per deployment and handed to every
//! [`CacheStore`](crate::CacheStore) at construction. Stores register on
//! `initialize` and unregister on `destroy`; the sweeper only keeps weak
//! references, so a dropped store simply disappears from the next pass.

mod registry;
mod scheduler;

pub use registry::{RegistrationId, Sweepable};
pub use scheduler::{DormantSweeper, SweepReport, SweeperHandle};
