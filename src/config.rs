//! Configuration options accepted by [`crate::FtpStream::open`].
//!
//! Rust analogue of the original implementation's `AVOption` table: each
//! field below has exactly one option in the wire protocol's configuration
//! surface (`spec.md` §6).

use std::time::Duration;

/// Default control-channel port, used when the URL omits one or specifies
/// one outside `0..=65535`.
pub(crate) const DEFAULT_CONTROL_PORT: u16 = 21;

/// Password sent for anonymous logins when [`Config::anonymous_password`]
/// is unset.
pub(crate) const DEFAULT_ANONYMOUS_PASSWORD: &str = "nopassword";

/// Per-call ceiling while waiting for a pending reply after a line reader
/// `Interrupted` result: 100 polls of 10ms each, i.e. one second total.
pub(crate) const STATUS_POLL_ATTEMPTS: u32 = 100;
pub(crate) const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Control buffer size in bytes, matching `CONTROL_BUFFER_SIZE` in the
/// original implementation.
pub(crate) const CONTROL_BUFFER_SIZE: usize = 1024;

/// User-configurable options for an [`crate::FtpStream`].
///
/// `timeout: None` means "let the transport pick its own default", the
/// Rust reading of the original's `-1` sentinel.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Per-socket I/O timeout forwarded to the transport.
    pub timeout: Option<Duration>,
    /// If true, advertise the write stream as seekable even when `SIZE`
    /// could not be queried (or wasn't attempted) before a `STOR`.
    pub write_seekable: bool,
    /// Password used when the URL carries no user (anonymous login).
    pub anonymous_password: Option<String>,
}

impl Config {
    pub fn anonymous_password(&self) -> &str {
        self.anonymous_password
            .as_deref()
            .unwrap_or(DEFAULT_ANONYMOUS_PASSWORD)
    }
}

/// Which direction the caller intends to use the stream for. Determines how
/// a failed `SIZE` query affects seekability (`spec.md` §4.E step 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// Seek origin, the Rust reading of `spec.md`'s `SET`/`CUR`/`END`/`SIZE`
/// whence values. `Size` is a pure query: it returns the known file size
/// without touching any connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Set,
    Cur,
    End,
    Size,
}
