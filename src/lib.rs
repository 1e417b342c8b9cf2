//! Load and fault-injection harness for a length-prefixed, priority-tagged
//! event protocol.
//!
//! The crate encodes events into the receiver's binary frame layout
//! ([`frame`]), writes them over TCP or UDP sessions ([`transport`],
//! [`supervisor`]), expands named scenarios into traffic ([`scenario`]) and
//! runs many workers at once while accounting for what was attempted, sent
//! and lost ([`orchestrator`], [`metrics`]). The harness never reads replies.

pub mod event;
pub mod frame;
pub mod harness;
pub mod metrics;
pub mod orchestrator;
pub mod payload;
pub mod scenario;
pub mod stop;
pub mod supervisor;
#[cfg(any(test, feature = "test-support"))]
pub mod test_helpers;
pub mod topics;
pub mod transport;
