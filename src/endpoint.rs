/// Remote endpoint a client is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
    path: String,
}

impl Endpoint {
    pub const DEFAULT_PATH: &'static str = "/test-url";

    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
        }
    }

    /// Creates an endpoint for [`Endpoint::DEFAULT_PATH`].
    pub fn with_default_path(base_url: impl Into<String>) -> Self {
        Self::new(base_url, Self::DEFAULT_PATH)
    }

    /// Creates an endpoint from environment variables.
    ///
    /// Reads:
    /// - `TYPED_GET_URL` — base URL (e.g. `http://localhost:8080/`)
    /// - `TYPED_GET_PATH` — optional path, defaults to `/test-url`
    pub fn from_env() -> std::result::Result<Self, String> {
        let base_url = std::env::var("TYPED_GET_URL")
            .map_err(|_| "missing TYPED_GET_URL environment variable".to_owned())?;
        if base_url.trim().is_empty() {
            return Err("TYPED_GET_URL is set but empty".to_owned());
        }
        let path = match std::env::var("TYPED_GET_PATH") {
            Ok(path) if path.trim().is_empty() => {
                return Err("TYPED_GET_PATH is set but empty".to_owned())
            }
            Ok(path) => path,
            Err(_) => Self::DEFAULT_PATH.to_owned(),
        };
        Ok(Self::new(base_url.trim(), path.trim()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full request URL with exactly one `/` between base and path.
    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.path.trim_start_matches('/');
        if path.is_empty() {
            return base.to_owned();
        }
        format!("{base}/{path}")
    }
}
