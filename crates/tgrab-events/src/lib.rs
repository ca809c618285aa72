//! In-process job registry and event broadcast for TubeGrab.
//!
//! Jobs live for the process lifetime only; there is no persistence and no
//! cross-process delivery. Subscribers get events published after they
//! attach, nothing is replayed.

pub mod bus;
pub mod error;
pub mod registry;

pub use bus::{EventBus, CHANNEL_CAPACITY};
pub use error::{EventError, EventResult};
pub use registry::JobRegistry;
