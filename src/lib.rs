//! `typed-get` is an async client for a single JSON `GET` endpoint.
//!
//! [`TypedGetClient::get`] returns:
//! - `Ok(Some(value))` for a 2xx body that decodes into `T`
//! - `Ok(None)` for a 404
//! - `Err(ClientError)` for other statuses, undecodable bodies and transport
//!   faults
//!
//! A transport fault on the first attempt is retried once when its
//! [`FaultKind`] is in the client's [`RetryPolicy`].

mod client;
mod decode;
mod endpoint;
mod error;
mod options;
mod policy;
mod transport;
mod types;
mod wire;

pub use client::TypedGetClient;
pub use decode::interpret;
pub use endpoint::Endpoint;
pub use error::{ClientError, ErrorKind};
pub use options::ClientOptions;
pub use policy::{Attempt, RetryDecision, RetryPolicy};
pub use transport::{classify_body_error, classify_send_error, HttpTransport, Transport};
pub use types::{DecodedResult, FaultKind, RequestOutcome, ValueResponse};

pub type Result<T> = std::result::Result<T, ClientError>;
