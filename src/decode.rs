use serde::de::DeserializeOwned;

use crate::{ClientError, DecodedResult};

const NOT_FOUND: u16 = 404;

/// Interprets the status and body of a completed attempt.
///
/// 404 is absent, 2xx is decoded into `T`, anything else is an error. The
/// body of a 404 is never inspected.
pub fn interpret<T: DeserializeOwned>(status: u16, body: &[u8]) -> DecodedResult<T> {
    interpret_with(status, body, true)
}

pub(crate) fn interpret_with<T: DeserializeOwned>(
    status: u16,
    body: &[u8],
    dismiss_404: bool,
) -> DecodedResult<T> {
    match status {
        NOT_FOUND if dismiss_404 => DecodedResult::NotFound,
        200..=299 => match serde_json::from_slice::<T>(body) {
            Ok(value) => DecodedResult::Found(value),
            Err(err) => DecodedResult::Error(ClientError::Decode(format!(
                "invalid response JSON: {err}; body: {}",
                String::from_utf8_lossy(body)
            ))),
        },
        status => DecodedResult::Error(ClientError::HttpStatus {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }),
    }
}
