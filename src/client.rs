use std::{fmt, marker::PhantomData, time::Duration};

use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::{
    decode::interpret_with,
    policy::{Attempt, RetryDecision},
    ClientError, ClientOptions, Endpoint, HttpTransport, RequestOutcome, Result, Transport,
};

/// Typed GET client bound to a single endpoint.
///
/// Each [`get`](TypedGetClient::get) call makes one or two transport
/// attempts: the second only when the first faults with a kind in the
/// configured [`RetryPolicy`](crate::RetryPolicy). A 404 is returned as
/// `Ok(None)`.
pub struct TypedGetClient<T, X = HttpTransport> {
    transport: X,
    endpoint: Endpoint,
    options: ClientOptions,
    _target: PhantomData<fn() -> T>,
}

impl<T, X: Clone> Clone for TypedGetClient<T, X> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            endpoint: self.endpoint.clone(),
            options: self.options.clone(),
            _target: PhantomData,
        }
    }
}

impl<T, X> fmt::Debug for TypedGetClient<T, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedGetClient")
            .field("endpoint", &self.endpoint)
            .field("options", &self.options)
            .finish()
    }
}

impl<T> TypedGetClient<T> {
    /// Creates a client using the `reqwest` transport and default options.
    pub fn new(endpoint: Endpoint) -> Self {
        let options = ClientOptions::default();
        Self::with_transport(endpoint, HttpTransport::new(options.timeout_ms))
    }

    /// Creates a client from environment variables.
    ///
    /// See [`Endpoint::from_env`] for the variables read.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use typed_get::{TypedGetClient, ValueResponse};
    ///
    /// let client = TypedGetClient::<ValueResponse>::from_env().expect("missing TYPED_GET_URL");
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        Ok(Self::new(Endpoint::from_env()?))
    }
}

impl<T, X: Transport> TypedGetClient<T, X> {
    /// Creates a client over any transport.
    pub fn with_transport(endpoint: Endpoint, transport: X) -> Self {
        Self {
            transport,
            endpoint,
            options: ClientOptions::default(),
            _target: PhantomData,
        }
    }

    /// Applies timeout, retry and 404 options.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.transport.apply_options(&opts);
        self.options = opts;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

impl<T: DeserializeOwned, X: Transport> TypedGetClient<T, X> {
    /// Fetches and decodes the endpoint.
    ///
    /// Returns `Ok(None)` for a 404 (unless `dismiss_404` is off) and
    /// `Ok(Some(value))` for a decodable 2xx body.
    pub async fn get(&self) -> Result<Option<T>> {
        let url = self.endpoint.url();
        let mut attempt = Attempt::First;
        loop {
            #[cfg(feature = "tracing")]
            tracing::debug!("GET {} (attempt {})", url, attempt.number());

            let outcome = self.transport.send(&url).await;

            if let RetryDecision::Retry = self.options.retry_policy.decide(attempt, &outcome) {
                if let Some(next) = attempt.next() {
                    #[cfg(feature = "tracing")]
                    if let RequestOutcome::TransportFault { kind, detail } = &outcome {
                        tracing::warn!("retrying GET {} after {} fault: {}", url, kind, detail);
                    }

                    self.wait_before_retry().await;
                    attempt = next;
                    continue;
                }
            }

            return self.finish(outcome);
        }
    }

    fn finish(&self, outcome: RequestOutcome) -> Result<Option<T>> {
        match outcome {
            RequestOutcome::TransportFault { kind, detail } => {
                #[cfg(feature = "tracing")]
                tracing::debug!("GET {} failed with {} fault: {}", self.endpoint.url(), kind, detail);

                Err(ClientError::Transport { kind, detail })
            }
            RequestOutcome::Success { status, body } => {
                let decoded = interpret_with::<T>(status, &body, self.options.dismiss_404);

                #[cfg(feature = "tracing")]
                if matches!(decoded, crate::DecodedResult::NotFound) {
                    tracing::debug!("GET {} returned 404, treating as absent", self.endpoint.url());
                }

                decoded.into_result()
            }
        }
    }

    async fn wait_before_retry(&self) {
        if self.options.retry_delay_ms == 0 {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("waiting {} ms before retry", self.options.retry_delay_ms);

        sleep(Duration::from_millis(self.options.retry_delay_ms)).await;
    }
}
