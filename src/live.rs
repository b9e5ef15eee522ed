//! A blocking client for the Databento Live Subscription Gateway (LSG): a
//! text-framed, CRAM-authenticated session protocol that switches to a DBN
//! stream over the same connection.

mod client;
pub mod protocol;

pub use client::{LiveClient, READ_BUFFER_CAPACITY};
pub use protocol::{cram_reply, validate_key, Subscription, API_KEY_LENGTH};

use crate::{Encoding, Error, Result};

/// The environment variable holding the API key.
pub const API_KEY_ENV_VAR: &str = "DATABENTO_API_KEY";
/// The environment variable overriding the client identity sent during
/// authentication.
pub const CLIENT_ENV_VAR: &str = "DATABENTO_CLIENT";

/// Configuration for a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveConfig {
    key: String,
    /// The dataset code to subscribe to.
    pub dataset: String,
    /// The encoding the gateway will use for the record stream.
    pub encoding: Encoding,
    /// Whether the gateway will append its send timestamp to each record.
    pub ts_out: bool,
    /// The client identity sent during authentication.
    pub client: String,
}

impl LiveConfig {
    /// Creates a new config for subscribing to `dataset` with sensible
    /// defaults: DBN encoding, no send timestamps.
    ///
    /// # Errors
    /// This function returns an error if `key` isn't a plausible API key.
    /// The key is validated before any connection is made.
    pub fn new(key: impl ToString, dataset: impl ToString) -> Result<Self> {
        let key = key.to_string();
        protocol::validate_key(&key)?;
        Ok(Self {
            key,
            dataset: dataset.to_string(),
            encoding: Encoding::Dbn,
            ts_out: false,
            client: default_client(),
        })
    }

    /// Creates a new config for subscribing to `dataset`, reading the API
    /// key from `DATABENTO_API_KEY` and the client identity from
    /// `DATABENTO_CLIENT` if set.
    ///
    /// # Errors
    /// This function returns an error if the key environment variable is
    /// unset or doesn't contain a plausible API key.
    pub fn from_env(dataset: impl ToString) -> Result<Self> {
        let key = std::env::var(API_KEY_ENV_VAR).map_err(|_| Error::BadArgument {
            param_name: API_KEY_ENV_VAR.to_owned(),
            desc: "environment variable not set".to_owned(),
        })?;
        let mut res = Self::new(key, dataset)?;
        if let Ok(client) = std::env::var(CLIENT_ENV_VAR) {
            res.client = client;
        }
        Ok(res)
    }

    /// Sets the encoding the gateway will use for the record stream and
    /// returns the config.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets whether the gateway will append its send timestamp to each
    /// record and returns the config.
    pub fn with_ts_out(mut self, ts_out: bool) -> Self {
        self.ts_out = ts_out;
        self
    }

    /// Sets the client identity sent during authentication and returns the
    /// config.
    pub fn with_client(mut self, client: impl ToString) -> Self {
        self.client = client.to_string();
        self
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }
}

fn default_client() -> String {
    concat!("Rust ", env!("CARGO_PKG_VERSION")).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_API_KEY: &str = "db-89s9vCvwDDKPdQJ5Pb30Fyj9mNUM6";

    #[test]
    fn test_config_rejects_short_key() {
        let res = LiveConfig::new("db-tooshort", "GLBX.MDP3");
        assert!(matches!(res, Err(Error::BadArgument { .. })));
    }

    #[test]
    fn test_config_defaults() {
        let config = LiveConfig::new(TEST_API_KEY, "GLBX.MDP3").unwrap();
        assert_eq!(config.encoding, Encoding::Dbn);
        assert!(!config.ts_out);
        assert!(config.client.starts_with("Rust"));
    }
}
