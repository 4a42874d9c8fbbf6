//! Crate-wide error type.
//!
//! The teacher crate had a single `MessageError` for "unexpected message
//! type". A Chord node has a few more ways to fail that are worth telling
//! apart in a log line: a bad config file, a malformed wire address, an I/O
//! error, and a failed `join`. [`Error`] folds those into one small tagged
//! enum instead of reaching for a crate per failure mode.

use std::fmt;
use std::io;

use crate::message::AddressParseError;

/// Everything that can go wrong inside this crate.
#[derive(Debug)]
pub enum Error {
    /// A TCP or filesystem operation failed.
    Io(io::Error),
    /// The config file was missing, malformed, or missing a required key.
    Config(String),
    /// A wire-format address string did not parse.
    AddressParse(AddressParseError),
    /// `join` could not establish a successor through the given peer.
    JoinFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::AddressParse(e) => write!(f, "address parse error: {}", e),
            Error::JoinFailed(msg) => write!(f, "join failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::AddressParse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<AddressParseError> for Error {
    fn from(e: AddressParseError) -> Self {
        Error::AddressParse(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
