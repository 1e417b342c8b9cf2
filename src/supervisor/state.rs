//! Connection lifecycle state machine.
//!
//! ```text
//! Disconnected --ConnectRequested--> Connecting --ConnectSucceeded--> Connected
//!                                        |                              |
//!                                  ConnectFailed                    SendFailed
//!                                        v                              |
//!                                     Failed <--------------------------+
//!                                        |
//!                                  BackoffElapsed --> Connecting
//! ```
//!
//! `Closed` returns any state to `Disconnected`.

/// Where a supervised connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection and no attempt pending.
    #[default]
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// A live session is held.
    Connected,
    /// The last attempt or send failed; waiting out the backoff.
    Failed,
}

/// Inputs that drive [`ConnectionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The caller needs a session.
    ConnectRequested,
    /// The connector returned a session.
    ConnectSucceeded,
    /// The connector failed.
    ConnectFailed,
    /// A write on the held session failed.
    SendFailed,
    /// The backoff delay has passed.
    BackoffElapsed,
    /// The caller released the connection.
    Closed,
}

impl ConnectionState {
    /// Next state after `event`, or `None` when `event` is not valid here.
    #[must_use]
    pub const fn transition(self, event: ConnectionEvent) -> Option<Self> {
        use ConnectionEvent as E;
        match (self, event) {
            (_, E::Closed) => Some(Self::Disconnected),
            (Self::Disconnected, E::ConnectRequested) | (Self::Failed, E::BackoffElapsed) => {
                Some(Self::Connecting)
            }
            (Self::Connecting, E::ConnectSucceeded) => Some(Self::Connected),
            (Self::Connecting, E::ConnectFailed) | (Self::Connected, E::SendFailed) => {
                Some(Self::Failed)
            }
            _ => None,
        }
    }

    /// Whether the next connect attempt must wait out the backoff first.
    #[must_use]
    pub const fn needs_backoff(self) -> bool { matches!(self, Self::Failed) }
}
