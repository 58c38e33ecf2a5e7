//! Background template-root watching.
//!
//! Observes the template root with the platform's recommended `notify`
//! backend, collapses bursts of writes within a debounce window, and
//! reports real content changes (fingerprint actually differs) to a
//! [`ChangeObserver`]. Watch failures are warnings, never render errors:
//! the affected path just stays stale until the next successful check.

#![warn(missing_docs)]

mod watchout;

pub use watchout::{spawn, ChangeObserver, WatchConfig, WatchHandle};
