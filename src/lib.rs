//! A synchronous FTP client (RFC 959 subset) exposing a single random-access
//! byte stream.
//!
//! The client opens a plain-text control channel, authenticates, resolves
//! the working directory, and lazily opens a passive-mode data channel for
//! each read or write burst, presenting the remote file as a seekable
//! stream of bytes with an advertised total size.
//!
//! Active mode, TLS/FTPS, EPSV, ASCII transfer mode, directory listing, and
//! concurrent transfers on one handle are out of scope.
//!
//! # Example
//! ```no_run
//! use ftpstream::{Config, FtpStream, OpenMode};
//!
//! # fn example() -> ftpstream::Result<()> {
//! let mut stream = FtpStream::open("ftp://anonymous@ftp.example.com/pub/file", OpenMode::Read, Config::default())?;
//! let mut buf = [0u8; 1024];
//! let n = stream.read(&mut buf)?;
//! # let _ = n;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod reply;
mod session;
mod stream;
pub(crate) mod transport;

pub use config::{Config, OpenMode, Whence};
pub use error::{Error, Result};
pub use stream::FtpStream;
pub use transport::Transport;
