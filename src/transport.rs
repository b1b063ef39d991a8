//! Abstraction for the underlying byte transport (`spec.md` §6, "Transport
//! contract"). Treated as an external collaborator by the specification;
//! this module supplies the trait seam plus the one concrete implementation
//! (plain TCP) this crate ships.
//!
//! Generalized from the teacher's `Transport`/`BufClear` split: there, a
//! `Transport` did one whole command/response transaction because framing
//! lived on the connection type; here framing (component A/B) lives on
//! [`crate::session::Session`], so the trait only needs to move raw bytes
//! and flip blocking mode.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

#[cfg(unix)]
use std::os::fd::{AsRawFd, RawFd};

/// A bidirectional byte channel with a settable blocking mode, matching the
/// control/data connections of `spec.md` §3 ("optional owned handle to a
/// bidirectional byte transport").
pub trait Transport: std::fmt::Debug + Send {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// Single partial write, mirroring `write(2)`/`send(2)` semantics: the
    /// data channel's `STOR` path (`spec.md` §4.F) needs the actual byte
    /// count written, not an all-or-nothing guarantee.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
    /// All-or-nothing send, for the control channel's one-shot commands.
    /// Default implementation loops on `write`; `TcpTransport` only needs to
    /// implement the partial form.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..])?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0 bytes"));
            }
            written += n;
        }
        Ok(())
    }
    /// Releases the transport (`spec.md` §6 `close(handle)`). Distinct from
    /// `shutdown`: `Session::close_both` uses this to retire a channel for
    /// good, while the stream facade's `shutdown` passthrough uses
    /// `shutdown` below for a half-close that a caller might still expect
    /// to query afterward.
    fn close(&mut self) -> io::Result<()>;
    fn shutdown(&mut self, how: Shutdown) -> io::Result<()>;
    /// Toggle the interruptible-blocking behavior the line reader relies on
    /// (`spec.md` §4.A/§9's `block_flag`): `true` makes `read` return
    /// promptly with `WouldBlock` when no data is currently available,
    /// `false` lets it block up to the configured timeout.
    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()>;
    /// OS file descriptor backing this transport, for multiplex
    /// integration (`spec.md` §4.G `file_handle` passthrough).
    #[cfg(unix)]
    fn file_handle(&self) -> RawFd;
}

/// Plain-TCP transport, the only mode this crate implements (`spec.md` §1
/// non-goals exclude FTPS/TLS).
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> io::Result<Self> {
        use std::net::ToSocketAddrs;

        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address found for host"))?;
        let stream = match timeout {
            Some(t) => TcpStream::connect_timeout(&addr, t)?,
            None => TcpStream::connect(addr)?,
        };
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.stream.write_all(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Both)
    }

    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        self.stream.shutdown(how)
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        self.stream.set_nonblocking(nonblocking)
    }

    #[cfg(unix)]
    fn file_handle(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory [`Transport`] double used throughout the test suite. The
    //! server side is a scripted queue of byte chunks; writes accumulate
    //! into a sink the test can inspect.
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Default)]
    pub(crate) struct MockTransport {
        /// Chunks yielded to `read`, in order; an empty queue means EOF.
        pub(crate) inbound: VecDeque<Vec<u8>>,
        pub(crate) outbound: Vec<u8>,
        pub(crate) nonblocking: bool,
        pub(crate) closed: bool,
    }

    impl MockTransport {
        pub(crate) fn with_script(chunks: impl IntoIterator<Item = &'static str>) -> Self {
            Self {
                inbound: chunks.into_iter().map(|c| c.as_bytes().to_vec()).collect(),
                ..Default::default()
            }
        }

        pub(crate) fn push(&mut self, chunk: &str) {
            self.inbound.push_back(chunk.as_bytes().to_vec());
        }
    }

    impl Transport for MockTransport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.inbound.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        let mut remainder = chunk;
                        remainder.drain(..n);
                        self.inbound.push_front(remainder);
                    }
                    Ok(n)
                }
                None if self.nonblocking => {
                    Err(io::Error::new(io::ErrorKind::WouldBlock, "no data scripted"))
                }
                None => Ok(0),
            }
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.outbound.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn close(&mut self) -> io::Result<()> {
            self.closed = true;
            Ok(())
        }

        fn shutdown(&mut self, _how: Shutdown) -> io::Result<()> {
            self.closed = true;
            Ok(())
        }

        fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
            self.nonblocking = nonblocking;
            Ok(())
        }

        #[cfg(unix)]
        fn file_handle(&self) -> RawFd {
            -1
        }
    }
}
