//! The text-framed wire messages the Live Subscription Gateway exchanges
//! before the session switches to a DBN stream.
//!
//! Every pre-stream message is a single `\n`-terminated line of
//! pipe-delimited `key=value` pairs with no whitespace.

use std::fmt::Write;

use sha2::{Digest, Sha256};

use crate::{Encoding, Error, Result, SType, Schema};

/// The required length of an API key in characters.
pub const API_KEY_LENGTH: usize = 32;
/// The number of trailing API key characters used as the bucket ID appended
/// to CRAM replies. It lets the gateway select the hashing key without the
/// key itself being revealed.
const BUCKET_ID_LENGTH: usize = 5;

/// Checks that `key` is a plausible API key: exactly
/// [`API_KEY_LENGTH`] ASCII characters. Rejecting malformed keys locally
/// avoids a doomed round trip to the gateway.
///
/// # Errors
/// This function returns an error if `key` has the wrong length or isn't
/// ASCII.
pub fn validate_key(key: &str) -> Result<()> {
    if key.len() != API_KEY_LENGTH || !key.is_ascii() {
        return Err(Error::BadArgument {
            param_name: "key".to_owned(),
            desc: format!("API keys are exactly {API_KEY_LENGTH} ASCII characters"),
        });
    }
    Ok(())
}

/// Computes the reply to a CRAM challenge: the lowercase hex SHA-256 digest
/// of `<challenge>|<key>`, followed by `-` and the last five characters of
/// the key.
///
/// # Errors
/// This function returns an error if `key` isn't a plausible API key.
pub fn cram_reply(key: &str, challenge: &str) -> Result<String> {
    validate_key(key)?;
    let digest = Sha256::digest(format!("{challenge}|{key}"));
    Ok(format!(
        "{}-{}",
        hex::encode(digest),
        &key[key.len() - BUCKET_ID_LENGTH..]
    ))
}

/// The gateway's first message of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// The version of the Live Subscription Gateway.
    pub lsg_version: String,
}

impl Greeting {
    pub(crate) fn parse(line: &str) -> Result<Self> {
        Ok(Self {
            lsg_version: required_field(line, "lsg_version")?.to_owned(),
        })
    }
}

/// The gateway's authentication challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// The random token to be combined with the API key in the CRAM reply.
    pub cram: String,
}

impl Challenge {
    pub(crate) fn parse(line: &str) -> Result<Self> {
        Ok(Self {
            cram: required_field(line, "cram")?.to_owned(),
        })
    }
}

/// The gateway's verdict on an authentication request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    /// Whether authentication succeeded.
    pub success: bool,
    /// The gateway's error message when authentication failed.
    pub error: Option<String>,
    /// An identifier for the session when authentication succeeded.
    pub session_id: Option<String>,
}

impl AuthResponse {
    pub(crate) fn parse(line: &str) -> Result<Self> {
        let success = required_field(line, "success")?;
        Ok(Self {
            success: success == "1",
            error: find_field(line, "error").map(ToOwned::to_owned),
            session_id: find_field(line, "session_id").map(ToOwned::to_owned),
        })
    }
}

/// The client's authentication request.
#[derive(Debug, Clone)]
pub(crate) struct AuthRequest<'a> {
    pub auth: &'a str,
    pub dataset: &'a str,
    pub encoding: Encoding,
    pub ts_out: bool,
    pub client: &'a str,
}

impl AuthRequest<'_> {
    pub(crate) fn encode(&self) -> String {
        format!(
            "auth={}|dataset={}|encoding={}|ts_out={}|client={}\n",
            self.auth,
            self.dataset,
            self.encoding.as_str(),
            self.ts_out as u8,
            self.client,
        )
    }
}

/// A subscription request for one schema and set of symbols. Several
/// subscriptions can be sent over one session before it's started; they
/// can't be withdrawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// The schema of the records to subscribe to.
    pub schema: Schema,
    /// The symbology type of `symbols`.
    pub stype_in: SType,
    /// The symbols to subscribe to.
    pub symbols: Vec<String>,
    /// The UNIX nanosecond timestamp to request intraday replay from, sent
    /// as the `time` field of the request. `None` means streaming starts
    /// from the present.
    pub start: Option<u64>,
    /// Whether to request an initial snapshot of the book.
    pub snapshot: bool,
}

impl Subscription {
    /// Creates a new subscription streaming from the present without a
    /// snapshot.
    pub fn new(
        schema: Schema,
        stype_in: SType,
        symbols: impl IntoIterator<Item = impl ToString>,
    ) -> Self {
        Self {
            schema,
            stype_in,
            symbols: symbols.into_iter().map(|s| s.to_string()).collect(),
            start: None,
            snapshot: false,
        }
    }

    /// Sets the intraday replay start time and returns the subscription.
    pub fn with_start(mut self, start: u64) -> Self {
        self.start = Some(start);
        self
    }

    /// Requests an initial snapshot and returns the subscription.
    pub fn with_snapshot(mut self) -> Self {
        self.snapshot = true;
        self
    }

    pub(crate) fn encode(&self) -> String {
        let mut line = format!(
            "schema={}|stype_in={}|symbols={}",
            self.schema.as_str(),
            self.stype_in.as_str(),
            self.symbols.join(","),
        );
        if let Some(start) = self.start {
            write!(line, "|time={start}").unwrap();
        }
        if self.snapshot {
            line.push_str("|snapshot=1");
        }
        line.push('\n');
        line
    }
}

/// Finds the value for `key` in a pipe-delimited `key=value` line.
fn find_field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.trim_end_matches('\n')
        .split('|')
        .filter_map(|pair| pair.split_once('='))
        .find_map(|(k, v)| (k == key).then_some(v))
}

fn required_field<'a>(line: &'a str, key: &str) -> Result<&'a str> {
    find_field(line, key).ok_or_else(|| {
        Error::decode(format!(
            "missing required field `{key}` in gateway message: {}",
            line.trim_end(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cram_reply() {
        // from the API docs' worked example
        let key = "db-89s9vCvwDDKPdQJ5Pb30Fyj9mNUM6";
        let cram = "j5pwMHz6vwXruJM4cOwQrQeQE0bImIzT";
        assert_eq!(
            cram_reply(key, cram).unwrap(),
            "6d3c875bb9f8cf503c3ed83ee5f476a3ad53f0c67706c51cf42d2db5ad8ff5a9-mNUM6"
        );
    }

    #[test]
    fn test_cram_reply_rejects_bad_key() {
        assert!(cram_reply("short", "challenge").is_err());
    }

    #[test]
    fn test_parse_greeting() {
        let greeting = Greeting::parse("lsg_version=1.4.0\n").unwrap();
        assert_eq!(greeting.lsg_version, "1.4.0");
        assert!(Greeting::parse("version=1.4.0\n").is_err());
    }

    #[test]
    fn test_parse_challenge() {
        let challenge = Challenge::parse("cram=abcdef123\n").unwrap();
        assert_eq!(challenge.cram, "abcdef123");
    }

    #[test]
    fn test_parse_auth_response_success() {
        let resp = AuthResponse::parse("success=1|session_id=42\n").unwrap();
        assert!(resp.success);
        assert_eq!(resp.session_id.as_deref(), Some("42"));
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_parse_auth_response_failure() {
        let resp = AuthResponse::parse("success=0|error=Authentication failed\n").unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Authentication failed"));
    }

    #[test]
    fn test_subscription_encode() {
        let sub = Subscription::new(Schema::Trades, SType::RawSymbol, ["ESM4", "NQM4"]);
        assert_eq!(
            sub.encode(),
            "schema=trades|stype_in=raw_symbol|symbols=ESM4,NQM4\n"
        );
    }

    #[test]
    fn test_subscription_encode_optional_fields() {
        let sub = Subscription::new(Schema::Mbo, SType::RawSymbol, ["ESM4"])
            .with_start(1609160400000000000)
            .with_snapshot();
        assert_eq!(
            sub.encode(),
            "schema=mbo|stype_in=raw_symbol|symbols=ESM4|time=1609160400000000000|snapshot=1\n"
        );
    }

    #[test]
    fn test_auth_request_encode() {
        let req = AuthRequest {
            auth: "digest-ABCDE",
            dataset: "GLBX.MDP3",
            encoding: Encoding::Dbn,
            ts_out: true,
            client: "Rust 0.3.0",
        };
        assert_eq!(
            req.encode(),
            "auth=digest-ABCDE|dataset=GLBX.MDP3|encoding=dbn|ts_out=1|client=Rust 0.3.0\n"
        );
    }
}
