//! Types for errors that can occur while working with DBN streams and live
//! sessions.

use std::io;

/// An error that can occur while processing DBN or communicating with the Live
/// Subscription Gateway.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error while reading or writing DBN or from the live gateway.
    #[error("I/O error: {source} while {context}")]
    Io {
        /// The original error.
        #[source]
        source: io::Error,
        /// The context in which the error occurred.
        context: String,
    },
    /// An error while decoding, e.g. a bad magic string or a truncated record.
    #[error("decoding error: {0}")]
    Decode(String),
    /// An error while encoding.
    #[error("encoding error: {0}")]
    Encode(String),
    /// An error from the Live Subscription Gateway, e.g. a failed
    /// authentication.
    #[error("live gateway error: {0}")]
    Gateway(String),
    /// An error when a conversion between types failed.
    #[error("couldn't convert {input} to {desired_type}")]
    Conversion {
        /// The input to the conversion.
        input: String,
        /// The desired type of the conversion.
        desired_type: &'static str,
    },
    /// An error with conversion of bytes to UTF-8.
    #[error("UTF-8 error: {source} while {context}")]
    Utf8 {
        /// The original error.
        #[source]
        source: std::str::Utf8Error,
        /// The context in which the error occurred.
        context: String,
    },
    /// An error indicating an argument was invalid.
    #[error("bad argument `{param_name}`: {desc}")]
    BadArgument {
        /// The name of the parameter.
        param_name: String,
        /// The description of the invalid argument.
        desc: String,
    },
}

/// An alias for a `Result` with [`enum@Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

// Scanners keep their terminal error and report it on every subsequent call,
// which requires duplicating the error. `io::Error` isn't `Clone`, so the
// `Io` variant is rebuilt from its kind and message.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Self::Io { source, context } => Self::Io {
                source: io::Error::new(source.kind(), source.to_string()),
                context: context.clone(),
            },
            Self::Decode(msg) => Self::Decode(msg.clone()),
            Self::Encode(msg) => Self::Encode(msg.clone()),
            Self::Gateway(msg) => Self::Gateway(msg.clone()),
            Self::Conversion {
                input,
                desired_type,
            } => Self::Conversion {
                input: input.clone(),
                desired_type,
            },
            Self::Utf8 { source, context } => Self::Utf8 {
                source: *source,
                context: context.clone(),
            },
            Self::BadArgument { param_name, desc } => Self::BadArgument {
                param_name: param_name.clone(),
                desc: desc.clone(),
            },
        }
    }
}

impl Error {
    /// Creates a new I/O [`enum@Error`].
    pub fn io(error: io::Error, context: impl ToString) -> Self {
        Self::Io {
            source: error,
            context: context.to_string(),
        }
    }

    /// Creates a new decode [`enum@Error`].
    pub fn decode(msg: impl ToString) -> Self {
        Self::Decode(msg.to_string())
    }

    /// Creates a new encode [`enum@Error`].
    pub fn encode(msg: impl ToString) -> Self {
        Self::Encode(msg.to_string())
    }

    /// Creates a new gateway [`enum@Error`].
    pub fn gateway(msg: impl ToString) -> Self {
        Self::Gateway(msg.to_string())
    }

    /// Creates a new conversion [`enum@Error`] where `T` is the desired type.
    pub fn conversion<T>(input: impl ToString) -> Self {
        Self::Conversion {
            input: input.to_string(),
            desired_type: std::any::type_name::<T>(),
        }
    }

    /// Creates a new UTF-8 [`enum@Error`].
    pub fn utf8(error: std::str::Utf8Error, context: impl ToString) -> Self {
        Self::Utf8 {
            source: error,
            context: context.to_string(),
        }
    }
}

/// Maps a clean end of the stream to `Ok(None)` so callers can distinguish
/// exhaustion from hard failures.
pub(crate) fn silence_eof_error<T>(error: io::Error) -> io::Result<Option<T>> {
    if error.kind() == io::ErrorKind::UnexpectedEof {
        Ok(None)
    } else {
        Err(error)
    }
}
