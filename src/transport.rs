use std::{error::Error as StdError, io, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{header, Url};

use crate::{wire, ClientOptions, FaultKind, RequestOutcome};

/// Sends a single GET and reports what happened on the wire.
///
/// Implementations must not retry on their own; the client owns the retry
/// decision.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str) -> RequestOutcome;

    /// Picks up transport-level settings such as the timeout.
    fn apply_options(&mut self, _options: &ClientOptions) {}
}

/// Options reach the inner transport only while the `Arc` is unique; a
/// transport shared with other clients keeps its own settings.
#[async_trait]
impl<X: Transport + ?Sized> Transport for Arc<X> {
    async fn send(&self, url: &str) -> RequestOutcome {
        (**self).send(url).await
    }

    fn apply_options(&mut self, options: &ClientOptions) {
        if let Some(inner) = Arc::get_mut(self) {
            inner.apply_options(options);
        }
    }
}

/// Default transport.
///
/// `http://` URLs go over a plain socket where every response byte is
/// counted, so an empty close is told apart from a truncated head. Other
/// schemes go through `reqwest`, which cannot make that distinction; there a
/// close before the response completed is reported as
/// [`FaultKind::RandomDataThenClose`].
#[derive(Clone, Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    timeout: Duration,
    plain_wire: bool,
}

impl HttpTransport {
    pub fn new(timeout_ms: u64) -> Self {
        Self::with_client(reqwest::Client::new(), timeout_ms)
    }

    /// Wraps an existing client, e.g. one with custom TLS roots.
    pub fn with_client(http: reqwest::Client, timeout_ms: u64) -> Self {
        Self {
            http,
            timeout: Duration::from_millis(timeout_ms),
            plain_wire: true,
        }
    }

    /// Sends `http://` URLs through `reqwest` as well.
    pub fn reqwest_only(mut self) -> Self {
        self.plain_wire = false;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send_with_reqwest(&self, url: &str) -> RequestOutcome {
        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => return RequestOutcome::fault(classify_send_error(&err), describe(&err)),
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(body) => RequestOutcome::success(status, body.to_vec()),
            Err(err) => RequestOutcome::fault(classify_body_error(&err), describe(&err)),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, url: &str) -> RequestOutcome {
        if self.plain_wire {
            if let Ok(parsed) = Url::parse(url) {
                if parsed.scheme() == "http" {
                    return wire::fetch(&parsed, self.timeout).await;
                }
            }
        }
        self.send_with_reqwest(url).await
    }

    fn apply_options(&mut self, options: &ClientOptions) {
        self.timeout = Duration::from_millis(options.timeout_ms);
    }
}

/// Classifies an error raised before a response head was available.
pub fn classify_send_error(err: &reqwest::Error) -> FaultKind {
    if err.is_timeout() || err.is_connect() || err.is_builder() || err.is_redirect() {
        return FaultKind::Other;
    }
    classify_send_chain(err)
}

/// Classifies an error raised while reading the body of a response whose
/// status line was already received.
pub fn classify_body_error(err: &reqwest::Error) -> FaultKind {
    if err.is_timeout() {
        return FaultKind::Other;
    }
    classify_body_chain(err)
}

fn classify_send_chain(err: &(dyn StdError + 'static)) -> FaultKind {
    if has_io_kind(err, is_timeout_kind) {
        return FaultKind::Other;
    }
    if has_io_kind(err, is_reset_kind) {
        return FaultKind::ConnectionReset;
    }
    // hyper reports the same incomplete-message error whether or not part of
    // the head arrived, so the close cannot be proven empty.
    if mentions(err, &["closed before message completed"]) || is_head_parse_error(err) {
        return FaultKind::RandomDataThenClose;
    }
    FaultKind::Other
}

// The status line was parsed, so part of a response was observed; a reset
// here is a truncated body, not a clean reset.
fn classify_body_chain(err: &(dyn StdError + 'static)) -> FaultKind {
    if has_io_kind(err, is_timeout_kind) {
        return FaultKind::Other;
    }
    FaultKind::MalformedChunk
}

fn is_head_parse_error(err: &(dyn StdError + 'static)) -> bool {
    mentions(
        err,
        &["message head is too large", "received unexpected message"],
    ) || chain(err).any(|err| {
        let text = err.to_string();
        text.starts_with("invalid ") && text.contains("parsed")
    })
}

fn chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&err| err.source())
}

fn has_io_kind(err: &(dyn StdError + 'static), pred: fn(io::ErrorKind) -> bool) -> bool {
    chain(err).any(|err| {
        err.downcast_ref::<io::Error>()
            .is_some_and(|io_err| pred(io_err.kind()))
    })
}

fn is_reset_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe
    )
}

fn is_timeout_kind(kind: io::ErrorKind) -> bool {
    kind == io::ErrorKind::TimedOut
}

fn mentions(err: &(dyn StdError + 'static), needles: &[&str]) -> bool {
    chain(err).any(|err| {
        let text = err.to_string();
        needles.iter().any(|needle| text.contains(needle))
    })
}

/// Joins the error and all of its sources into one line.
fn describe(err: &(dyn StdError + 'static)) -> String {
    chain(err)
        .map(|err| err.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use std::{error::Error as StdError, fmt, io, sync::Arc, time::Duration};

    use super::{classify_body_chain, classify_send_chain, describe, HttpTransport, Transport};
    use crate::{ClientOptions, FaultKind};

    #[derive(Debug)]
    struct Layer {
        message: &'static str,
        source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    }

    impl Layer {
        fn leaf(message: &'static str) -> Self {
            Self {
                message,
                source: None,
            }
        }

        fn over(message: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
            Self {
                message,
                source: Some(Box::new(source)),
            }
        }
    }

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl StdError for Layer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.source
                .as_deref()
                .map(|err| err as &(dyn StdError + 'static))
        }
    }

    fn send_kind(err: Layer) -> FaultKind {
        classify_send_chain(&err)
    }

    #[test]
    fn reset_in_chain_is_connection_reset() {
        let err = Layer::over(
            "error sending request",
            Layer::over(
                "connection error",
                io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"),
            ),
        );
        assert_eq!(send_kind(err), FaultKind::ConnectionReset);
    }

    #[test]
    fn broken_pipe_is_connection_reset() {
        let err = Layer::over(
            "error sending request",
            io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
        );
        assert_eq!(send_kind(err), FaultKind::ConnectionReset);
    }

    #[test]
    fn incomplete_message_is_not_assumed_empty() {
        let err = Layer::over(
            "client error (SendRequest)",
            Layer::leaf("connection closed before message completed"),
        );
        assert_eq!(send_kind(err), FaultKind::RandomDataThenClose);
    }

    #[test]
    fn other_head_parse_errors_are_random_data() {
        for message in [
            "invalid content-length parsed",
            "invalid HTTP header parsed",
            "invalid HTTP status-code parsed",
            "message head is too large",
        ] {
            let err = Layer::over("client error (SendRequest)", Layer::leaf(message));
            assert_eq!(send_kind(err), FaultKind::RandomDataThenClose, "{message}");
        }
    }

    #[test]
    fn unparsable_head_is_random_data() {
        let err = Layer::over(
            "client error (SendRequest)",
            Layer::leaf("invalid HTTP version parsed"),
        );
        assert_eq!(send_kind(err), FaultKind::RandomDataThenClose);
    }

    #[test]
    fn timeout_wins_over_other_signals() {
        let err = Layer::over(
            "connection closed before message completed",
            io::Error::new(io::ErrorKind::TimedOut, "deadline elapsed"),
        );
        assert_eq!(send_kind(err), FaultKind::Other);
    }

    #[test]
    fn unknown_send_error_is_other() {
        let err = Layer::over(
            "error sending request",
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        );
        assert_eq!(send_kind(err), FaultKind::Other);
    }

    #[test]
    fn body_errors_are_malformed_chunk() {
        let err = Layer::over(
            "error decoding response body",
            io::Error::new(io::ErrorKind::InvalidInput, "Invalid chunk size line"),
        );
        assert_eq!(classify_body_chain(&err), FaultKind::MalformedChunk);

        let err = Layer::over(
            "error reading a body from connection",
            io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"),
        );
        assert_eq!(classify_body_chain(&err), FaultKind::MalformedChunk);
    }

    #[test]
    fn body_timeout_is_other() {
        let err = Layer::over(
            "error reading a body from connection",
            io::Error::new(io::ErrorKind::TimedOut, "timed out"),
        );
        assert_eq!(classify_body_chain(&err), FaultKind::Other);
    }

    #[test]
    fn describe_joins_sources() {
        let err = Layer::over("outer", Layer::over("middle", Layer::leaf("inner")));
        assert_eq!(describe(&err), "outer: middle: inner");
    }

    #[test]
    fn apply_options_sets_timeout() {
        let mut transport = HttpTransport::new(10_000);
        transport.apply_options(&ClientOptions::default().with_timeout_ms(30));
        assert_eq!(transport.timeout(), Duration::from_millis(30));
    }

    #[test]
    fn unique_arc_forwards_options() {
        let mut transport = Arc::new(HttpTransport::new(10_000));
        transport.apply_options(&ClientOptions::default().with_timeout_ms(30));
        assert_eq!(transport.timeout(), Duration::from_millis(30));
    }

    #[test]
    fn shared_arc_keeps_its_settings() {
        let mut transport = Arc::new(HttpTransport::new(10_000));
        let other = Arc::clone(&transport);
        transport.apply_options(&ClientOptions::default().with_timeout_ms(30));
        assert_eq!(transport.timeout(), Duration::from_secs(10));
        assert_eq!(other.timeout(), Duration::from_secs(10));
    }
}
