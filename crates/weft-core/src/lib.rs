pub mod config;
pub mod envelope;
pub mod error;
pub mod observe;
pub mod participant;

pub use config::AppConfig;
pub use envelope::{Envelope, Payload, Recipient, Role};
pub use error::{Result, WeftError};
pub use observe::{LogObserver, NoopObserver, SpanId, SpanObserver, SpanStatus};
pub use participant::{Handler, HandlerParticipant, Participant, Trigger};
