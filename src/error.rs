use crate::FaultKind;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport fault that was not retryable or persisted through the retry.
    #[error("transport error ({kind}): {detail}")]
    Transport { kind: FaultKind, detail: String },
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    HttpStatus { status: u16, body: String },
    /// A 2xx body could not be decoded into the target type.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Classification of a [`ClientError`] without its detail text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Transport(FaultKind),
    HttpStatus(u16),
    DecodeFailure,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { kind, .. } => ErrorKind::Transport(*kind),
            Self::HttpStatus { status, .. } => ErrorKind::HttpStatus(*status),
            Self::Decode(_) => ErrorKind::DecodeFailure,
        }
    }

    /// Fault kind for transport errors, `None` otherwise.
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{ClientError, ErrorKind, FaultKind};

    #[test]
    fn kind_strips_detail() {
        let err = ClientError::Transport {
            kind: FaultKind::MalformedChunk,
            detail: "invalid chunk size line".to_owned(),
        };
        assert_eq!(err.kind(), ErrorKind::Transport(FaultKind::MalformedChunk));
        assert_eq!(err.fault_kind(), Some(FaultKind::MalformedChunk));

        let err = ClientError::HttpStatus {
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.kind(), ErrorKind::HttpStatus(503));
        assert_eq!(err.fault_kind(), None);
    }

    #[test]
    fn display_includes_fault_kind() {
        let err = ClientError::Transport {
            kind: FaultKind::ConnectionReset,
            detail: "peer reset".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "transport error (connection_reset): peer reset"
        );
    }
}
