use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one live connection.
///
/// `Connecting -> Open -> Closing -> Closed`, or straight to `Closed` when the
/// handshake fails, the transport errors, or the remote side hangs up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionStatus {
    pub const ALL: [ConnectionStatus; 4] = [
        ConnectionStatus::Connecting,
        ConnectionStatus::Open,
        ConnectionStatus::Closing,
        ConnectionStatus::Closed,
    ];

    /// Display label shown in list headers. Adding a variant without a label
    /// does not compile.
    pub const fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "CONNECTING",
            ConnectionStatus::Open => "OPEN",
            ConnectionStatus::Closing => "CLOSING",
            ConnectionStatus::Closed => "CLOSED",
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, ConnectionStatus::Open)
    }

    pub fn is_closed(self) -> bool {
        matches!(self, ConnectionStatus::Closed)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
