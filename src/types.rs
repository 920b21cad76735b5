use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ClientError;

/// Why a transport attempt failed before a usable status and body existed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaultKind {
    /// Peer reset the connection before any response byte arrived.
    ConnectionReset,
    /// Peer closed the connection without sending anything.
    EmptyResponse,
    /// Bytes arrived that do not form an HTTP response head, then close.
    RandomDataThenClose,
    /// Status line arrived but the body framing was broken or cut short.
    MalformedChunk,
    /// Anything the transport could not place in the kinds above.
    Other,
}

impl FaultKind {
    pub const ALL: [FaultKind; 5] = [
        FaultKind::ConnectionReset,
        FaultKind::EmptyResponse,
        FaultKind::RandomDataThenClose,
        FaultKind::MalformedChunk,
        FaultKind::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionReset => "connection_reset",
            Self::EmptyResponse => "empty_response",
            Self::RandomDataThenClose => "random_data_then_close",
            Self::MalformedChunk => "malformed_chunk",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single transport attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A real HTTP status and the complete body.
    Success { status: u16, body: Vec<u8> },
    /// The attempt failed before a status and body were available.
    TransportFault { kind: FaultKind, detail: String },
}

impl RequestOutcome {
    pub fn success(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::Success {
            status,
            body: body.into(),
        }
    }

    pub fn fault(kind: FaultKind, detail: impl Into<String>) -> Self {
        Self::TransportFault {
            kind,
            detail: detail.into(),
        }
    }

    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Success { .. } => None,
            Self::TransportFault { kind, .. } => Some(*kind),
        }
    }
}

/// Interpretation of a terminal `Success` outcome.
#[derive(Debug)]
pub enum DecodedResult<T> {
    /// 2xx with a body that decoded into `T`.
    Found(T),
    /// 404: resource absent.
    NotFound,
    /// Decode failure or an unexpected status.
    Error(ClientError),
}

impl<T> DecodedResult<T> {
    pub fn into_result(self) -> crate::Result<Option<T>> {
        match self {
            Self::Found(value) => Ok(Some(value)),
            Self::NotFound => Ok(None),
            Self::Error(err) => Err(err),
        }
    }
}

/// Reference payload: `{"value": "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueResponse {
    pub value: String,
}
