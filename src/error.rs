use crate::address::SuiAddress;
use itertools::Itertools;
use std::{
    fmt,
    time::Duration,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// The HTTP layer failed or answered with a non-success status.
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// A well-formed GraphQL response that reported errors.
    Query(Vec<String>),
    /// The response envelope did not have the expected shape.
    Decode(String),
    Timeout(Duration),
    CapabilityNotFound {
        owner: SuiAddress,
    },
    ActionInFlight(String),
    Signing(String),
    Execution(String),
    InvalidAddress(String),
    InvalidInput(String),
}

impl Error {
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport {
                status: Some(status),
                message,
            } => write!(f, "network request failed with {status}: {message}"),
            Error::Transport {
                status: None,
                message,
            } => write!(f, "network request failed: {message}"),
            Error::Query(messages) => write!(f, "{}", messages.iter().join("\n")),
            Error::Decode(message) => write!(f, "unexpected response shape: {message}"),
            Error::Timeout(after) => {
                write!(f, "request timed out after {}s", after.as_secs())
            }
            Error::CapabilityNotFound { owner } => {
                write!(f, "no admin capability owned by {owner}")
            }
            Error::ActionInFlight(action) => {
                write!(f, "{action} is already waiting for confirmation")
            }
            Error::Signing(message) => write!(f, "signing failed: {message}"),
            Error::Execution(message) => write!(f, "execution failed: {message}"),
            Error::InvalidAddress(raw) => write!(f, "invalid Sui address '{raw}'"),
            Error::InvalidInput(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Decode(value.to_string())
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display__query_error__joins_server_messages_by_newline() {
        // given
        let error = Error::Query(vec!["boom".to_string(), "bang".to_string()]);

        // when
        let message = error.to_string();

        // then
        assert_eq!(message, "boom\nbang");
    }

    #[test]
    fn display__transport_error__includes_status() {
        let error = Error::transport(Some(502), "bad gateway");
        assert_eq!(
            error.to_string(),
            "network request failed with 502: bad gateway"
        );
    }
}
