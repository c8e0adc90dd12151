// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aether-storage: durable on-disk job store with cross-process locking.

pub mod lock;
pub mod paths;
pub mod store;

pub use lock::{JobLock, LockError};
pub use paths::{JobPaths, LOCK_FILE, STATE_FILE};
pub use store::{JobStore, StoreError};
