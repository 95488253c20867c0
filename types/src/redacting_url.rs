use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

use anyhow::{Error, Result};
use derive_more::FromStr;
use url::{ParseError, Url};

const REPLACEMENT_TOKEN: &str = "*";

/// Endpoint URL that hides credentials when printed.
///
/// Node URLs frequently embed API keys as basic auth credentials,
/// and every request failure ends up in the log with its URL.
// Only ad-hoc solutions exist for redacting credentials from URLs:
// <https://github.com/servo/rust-url/issues/714>
#[derive(Clone, PartialEq, Eq, Hash, FromStr)]
pub struct RedactingUrl {
    url: Url,
}

impl Display for RedactingUrl {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        fn sanitize(mut url: Url) -> Result<Url> {
            if !url.username().is_empty() {
                url.set_username(REPLACEMENT_TOKEN)
                    .map_err(|()| Error::msg("failed to sanitize URL username"))?;
            }

            if url.password().is_some() {
                url.set_password(Some(REPLACEMENT_TOKEN))
                    .map_err(|()| Error::msg("failed to sanitize URL password"))?;
            }

            Ok(url)
        }

        if !self.includes_credentials() {
            return write!(formatter, "{}", self.url);
        }

        match sanitize(self.url.clone()) {
            Ok(url) => write!(formatter, "{url}"),
            Err(error) => write!(formatter, "unsanitizable URL: {error}"),
        }
    }
}

impl Debug for RedactingUrl {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        Debug::fmt(self.to_string().as_str(), formatter)
    }
}

impl From<Url> for RedactingUrl {
    fn from(url: Url) -> Self {
        Self { url }
    }
}

impl RedactingUrl {
    #[must_use]
    pub fn into_url(self) -> Url {
        self.url
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Appends an API path to the base URL.
    ///
    /// Unlike [`Url::join`], a path prefix in the base URL is preserved,
    /// so `https://node.example/beacon` joined with `/eth/v1/...`
    /// yields `https://node.example/beacon/eth/v1/...`.
    pub fn join_api_path(&self, path: &str) -> Result<Url, ParseError> {
        let mut base = self.url.clone();

        if !base.path().ends_with('/') {
            let directory = format!("{}/", base.path());
            base.set_path(&directory);
        }

        base.join(path.trim_start_matches('/'))
    }

    fn includes_credentials(&self) -> bool {
        !self.url.username().is_empty() || self.url.password().is_some()
    }
}
