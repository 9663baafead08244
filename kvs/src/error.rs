use serde_derive::{Deserialize, Serialize};

/// kvs Result returning Error.
pub type KvResult<T> = std::result::Result<T, Error>;

/// kvs errors. All except `Cancelled` carry a message describing the cause;
/// callers match on the variant (the kind) rather than the text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// A store could not be decoded while reading (corrupt file, decrypt
    /// failure, codec mismatch). The read APIs downgrade this to the default
    /// value; it only surfaces from lower layers.
    Read(String),

    /// A commit failed during serialization, encryption or file replacement.
    /// No partial mutation persists when this is returned.
    Write(String),

    /// Plaintext could not be encrypted.
    Encrypt(String),

    /// Ciphertext could not be recovered to plaintext.
    Decrypt(String),

    /// An editor was used after (or during) commit, or a store was opened
    /// twice under the same name with a different configuration.
    InvalidState(String),

    /// A textual value failed to parse as the requested kind.
    Parse(String),

    /// An unexpected internal failure.
    Internal(String),

    /// The operation was cancelled. Never swallowed: result helpers re-raise
    /// this instead of converting it into a local error.
    Cancelled,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Read(msg) => write!(f, "read error: {}", msg),
            Error::Write(msg) => write!(f, "write error: {}", msg),
            Error::Encrypt(msg) => write!(f, "encrypt error: {}", msg),
            Error::Decrypt(msg) => write!(f, "decrypt error: {}", msg),
            Error::InvalidState(msg) => write!(f, "invalid state: {}", msg),
            Error::Parse(msg) => write!(f, "parse error: {}", msg),
            Error::Internal(msg) => write!(f, "internal error: {}", msg),
            Error::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Re-wraps this error as a write failure, keeping the original message.
    /// Used by commit paths so every failure surfaces with the Write kind.
    pub fn into_write(self) -> Self {
        match self {
            Error::Cancelled => Error::Cancelled,
            Error::Write(msg) => Error::Write(msg),
            other => Error::Write(other.to_string()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Error::Cancelled
        } else {
            Error::Internal(err.to_string())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::Read("boom".to_string()).to_string(), "read error: boom");
        assert_eq!(Error::Cancelled.to_string(), "operation cancelled");
    }

    #[test]
    fn test_into_write_preserves_cancellation() {
        assert_eq!(Error::Cancelled.into_write(), Error::Cancelled);
        assert_eq!(
            Error::Parse("bad int".to_string()).into_write(),
            Error::Write("parse error: bad int".to_string())
        );
    }
}
