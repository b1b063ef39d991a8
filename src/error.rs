//! Crate-wide error type.
//!
//! Mirrors the taxonomy in the specification: transport errors propagate
//! unchanged, malformed replies and unmatched response codes become
//! [`Error::Protocol`], authentication refusals become [`Error::AccessDenied`],
//! and caller misuse (bad seek whence) becomes [`Error::InvalidArgument`].
//! `Interrupted` and end-of-file are not represented here: they never escape
//! the stream facade (see [`crate::stream::FtpStream`]).

use thiserror::Error;

/// Errors produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
