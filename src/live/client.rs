//! The blocking live session client and its state machine.

use std::{
    io::{self, BufReader, Read, Write},
    net::TcpStream,
};

use crate::{
    decode::{DbnDecoder, JsonDecoder},
    publishers::{lsg_hostname, LSG_PORT},
    Encoding, Error, Result,
};

use super::{
    protocol::{cram_reply, AuthRequest, AuthResponse, Challenge, Greeting, Subscription},
    LiveConfig,
};

/// The capacity of the buffered reader placed in front of the stream once it
/// switches to DBN framing, so short network reads don't turn into per-field
/// reads.
pub const READ_BUFFER_CAPACITY: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// Connected, nothing exchanged yet.
    Connected,
    /// The CRAM handshake completed successfully.
    Authenticated,
}

/// A blocking client for one session with the Live Subscription Gateway.
///
/// The session advances through a strict sequence:
/// [`authenticate()`](Self::authenticate), any number of
/// [`subscribe()`](Self::subscribe) calls, then exactly one
/// [`start_dbn()`](Self::start_dbn) or [`start_json()`](Self::start_json),
/// which consumes the client and hands the connection over to a record
/// scanner. Dropping the client closes the connection; any read blocked on
/// the socket then fails with a transport error.
pub struct LiveClient<S = TcpStream> {
    stream: S,
    config: LiveConfig,
    state: SessionState,
    lsg_version: Option<String>,
    session_id: Option<String>,
}

impl LiveClient<TcpStream> {
    /// Connects to the gateway serving the configured dataset, at port
    /// 13000 of the dataset's `lsg.databento.com` host.
    ///
    /// # Errors
    /// This function returns an error if the TCP connection fails.
    pub fn connect(config: LiveConfig) -> Result<Self> {
        let hostname = lsg_hostname(&config.dataset);
        let stream = TcpStream::connect((hostname.as_str(), LSG_PORT))
            .map_err(|e| Error::io(e, format!("connecting to live gateway at {hostname}")))?;
        Ok(Self::with_stream(stream, config))
    }
}

impl<S> LiveClient<S>
where
    S: Read + Write,
{
    /// Creates a client for a session over an already-established stream.
    pub fn with_stream(stream: S, config: LiveConfig) -> Self {
        Self {
            stream,
            config,
            state: SessionState::Connected,
            lsg_version: None,
            session_id: None,
        }
    }

    /// Returns the gateway version from its greeting, once authenticated.
    pub fn lsg_version(&self) -> Option<&str> {
        self.lsg_version.as_deref()
    }

    /// Returns the session ID the gateway assigned, once authenticated.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Performs the CRAM handshake: reads the gateway's greeting and
    /// challenge, sends the authentication request, and reads the verdict.
    ///
    /// # Errors
    /// This function returns an error if the transport fails, a gateway
    /// message is malformed, or the gateway rejects the credentials; the
    /// rejection carries the gateway's error string.
    pub fn authenticate(&mut self) -> Result<()> {
        if self.state != SessionState::Connected {
            return Err(Error::gateway("session is already authenticated"));
        }
        let greeting = Greeting::parse(&self.read_line()?)?;
        let challenge = Challenge::parse(&self.read_line()?)?;
        let auth = cram_reply(self.config.key(), &challenge.cram)?;
        let request = AuthRequest {
            auth: &auth,
            dataset: &self.config.dataset,
            encoding: self.config.encoding,
            ts_out: self.config.ts_out,
            client: &self.config.client,
        };
        self.write_line(&request.encode())?;
        let response = AuthResponse::parse(&self.read_line()?)?;
        if !response.success {
            return Err(Error::gateway(format!(
                "authentication failed: {}",
                response.error.as_deref().unwrap_or("no reason given")
            )));
        }
        self.lsg_version = Some(greeting.lsg_version);
        self.session_id = response.session_id;
        self.state = SessionState::Authenticated;
        Ok(())
    }

    /// Sends a subscription request. May be called any number of times
    /// between authentication and session start; subscriptions persist until
    /// the session closes.
    ///
    /// # Errors
    /// This function returns an error if the session isn't authenticated or
    /// the transport fails.
    pub fn subscribe(&mut self, subscription: &Subscription) -> Result<()> {
        if self.state != SessionState::Authenticated {
            return Err(Error::gateway("must authenticate before subscribing"));
        }
        self.write_line(&subscription.encode())
    }

    /// Starts the session and attaches a binary DBN scanner to the stream.
    /// The gateway responds with DBN metadata followed by records for all
    /// accumulated subscriptions.
    ///
    /// # Errors
    /// This function returns an error if the session isn't authenticated,
    /// the configured encoding isn't DBN, or the transport fails.
    pub fn start_dbn(mut self) -> Result<DbnDecoder<BufReader<S>>> {
        self.start(Encoding::Dbn)?;
        Ok(DbnDecoder::new(BufReader::with_capacity(
            READ_BUFFER_CAPACITY,
            self.stream,
        )))
    }

    /// Starts the session and attaches a JSON-line scanner to the stream.
    /// The gateway responds with a metadata line followed by record lines
    /// for all accumulated subscriptions.
    ///
    /// # Errors
    /// This function returns an error if the session isn't authenticated,
    /// the configured encoding isn't JSON, or the transport fails.
    pub fn start_json(mut self) -> Result<JsonDecoder<BufReader<S>>> {
        self.start(Encoding::Json)?;
        Ok(JsonDecoder::new(BufReader::with_capacity(
            READ_BUFFER_CAPACITY,
            self.stream,
        )))
    }

    fn start(&mut self, expected_encoding: Encoding) -> Result<()> {
        if self.state != SessionState::Authenticated {
            return Err(Error::gateway("must authenticate before starting the session"));
        }
        if self.config.encoding != expected_encoding {
            return Err(Error::BadArgument {
                param_name: "encoding".to_owned(),
                desc: format!(
                    "session was authenticated with {} encoding",
                    self.config.encoding
                ),
            });
        }
        self.write_line("start_session\n")
    }

    /// Reads one `\n`-terminated line a byte at a time so that nothing past
    /// the terminator is consumed: the bytes after the final pre-stream line
    /// belong to the DBN stream, and the switch must be byte-exact.
    fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            if let Err(err) = self.stream.read_exact(&mut byte) {
                return Err(if err.kind() == io::ErrorKind::UnexpectedEof {
                    Error::gateway("gateway closed the connection during the session handshake")
                } else {
                    Error::io(err, "reading gateway message")
                });
            }
            if byte[0] == b'\n' {
                break;
            }
            line.push(byte[0]);
        }
        String::from_utf8(line)
            .map_err(|e| Error::decode(format!("gateway message isn't valid UTF-8: {e}")))
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.stream
            .write_all(line.as_bytes())
            .and_then(|()| self.stream.flush())
            .map_err(|e| Error::io(e, "sending gateway message"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{
        decode::DecodeRecord, encode::dbn::Encoder, record::TradeMsg, MetadataBuilder, SType,
        Schema,
    };

    use super::*;

    const TEST_API_KEY: &str = "db-89s9vCvwDDKPdQJ5Pb30Fyj9mNUM6";
    const TEST_CRAM: &str = "j5pwMHz6vwXruJM4cOwQrQeQE0bImIzT";
    const TEST_CRAM_REPLY: &str =
        "6d3c875bb9f8cf503c3ed83ee5f476a3ad53f0c67706c51cf42d2db5ad8ff5a9-mNUM6";

    /// An in-memory full-duplex stream: reads come from a scripted gateway
    /// transcript, writes accumulate for inspection.
    struct MockStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl MockStream {
        fn new(input: Vec<u8>) -> Self {
            Self {
                input: Cursor::new(input),
                output: Vec::new(),
            }
        }
    }

    impl Read for &mut MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for &mut MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn config() -> LiveConfig {
        LiveConfig::new(TEST_API_KEY, "GLBX.MDP3").unwrap()
    }

    fn handshake_input() -> Vec<u8> {
        format!("lsg_version=1.4.0\ncram={TEST_CRAM}\nsuccess=1|session_id=77\n").into_bytes()
    }

    #[test]
    fn test_authenticate_success() {
        let mut stream = MockStream::new(handshake_input());
        let mut client = LiveClient::with_stream(&mut stream, config());
        client.authenticate().unwrap();
        assert_eq!(client.lsg_version(), Some("1.4.0"));
        assert_eq!(client.session_id(), Some("77"));

        let sent = String::from_utf8(stream.output.clone()).unwrap();
        assert_eq!(
            sent,
            format!(
                "auth={TEST_CRAM_REPLY}|dataset=GLBX.MDP3|encoding=dbn|ts_out=0|client={}\n",
                config().client
            )
        );
    }

    #[test]
    fn test_authenticate_failure_reports_gateway_error() {
        let mut stream = MockStream::new(
            format!("lsg_version=1.4.0\ncram={TEST_CRAM}\nsuccess=0|error=Invalid key\n")
                .into_bytes(),
        );
        let mut client = LiveClient::with_stream(&mut stream, config());
        let res = client.authenticate();
        assert!(matches!(res, Err(Error::Gateway(msg)) if msg.contains("Invalid key")));
    }

    #[test]
    fn test_subscribe_requires_authentication() {
        let mut stream = MockStream::new(Vec::new());
        let mut client = LiveClient::with_stream(&mut stream, config());
        let sub = Subscription::new(Schema::Trades, SType::RawSymbol, ["ESM4"]);
        assert!(matches!(client.subscribe(&sub), Err(Error::Gateway(_))));
    }

    #[test]
    fn test_start_requires_matching_encoding() {
        let mut stream = MockStream::new(handshake_input());
        let mut client = LiveClient::with_stream(&mut stream, config());
        client.authenticate().unwrap();
        assert!(matches!(
            client.start_json(),
            Err(Error::BadArgument { param_name, .. }) if param_name == "encoding"
        ));
    }

    #[test]
    fn test_closed_connection_during_handshake() {
        let mut stream = MockStream::new(b"lsg_version=1.4.0\n".to_vec());
        let mut client = LiveClient::with_stream(&mut stream, config());
        assert!(matches!(client.authenticate(), Err(Error::Gateway(_))));
    }

    #[test]
    fn test_mode_switch_is_byte_exact() {
        // the gateway transcript: handshake lines immediately followed by a
        // binary DBN stream on the same connection
        let mut input = handshake_input();
        let metadata = MetadataBuilder::new()
            .dataset("GLBX.MDP3")
            .schema(Some(Schema::Trades))
            .start(1609160400000000000)
            .stype_in(Some(SType::RawSymbol))
            .stype_out(SType::InstrumentId)
            .build();
        let mut rec = TradeMsg::default();
        rec.hd.instrument_id = 5482;
        rec.sequence = 1170380;
        let mut encoder = Encoder::new(&mut input, &metadata).unwrap();
        encoder.encode_record(&rec).unwrap();

        let mut stream = MockStream::new(input);
        let mut client = LiveClient::with_stream(&mut stream, config());
        client.authenticate().unwrap();
        client
            .subscribe(&Subscription::new(
                Schema::Trades,
                SType::RawSymbol,
                ["ESM4"],
            ))
            .unwrap();
        let mut decoder = client.start_dbn().unwrap();
        assert_eq!(decoder.metadata().unwrap().dataset, "GLBX.MDP3");
        let decoded = decoder.decode_record::<TradeMsg>().unwrap().unwrap();
        assert_eq!(decoded.hd.instrument_id, 5482);
        assert_eq!(decoded.sequence, 1170380);
        assert!(decoder.decode_record::<TradeMsg>().unwrap().is_none());

        let sent = String::from_utf8(stream.output.clone()).unwrap();
        assert!(sent.contains("schema=trades|stype_in=raw_symbol|symbols=ESM4\n"));
        assert!(sent.ends_with("start_session\n"));
    }
}
