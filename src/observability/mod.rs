//! Observability: logging initialization and the structured event stream.

pub mod events;
pub mod logging;

pub use events::{Event, EventEmitter, FinishReason};
pub use logging::{LogFormat, init_logging};
