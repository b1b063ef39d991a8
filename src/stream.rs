//! Stream Facade (`spec.md` §4.G) plus the Transfer State Machine (§4.F) and
//! the `open()` half of the Connection Manager (§4.E) that only the facade
//! needs (URL parsing, the PWD/SIZE sequence, seekability determination).
//!
//! Generalized from the teacher's `BaseContext`: there, the public surface
//! was a grab-bag of device commands; here it collapses to the handful of
//! operations a random-access byte stream needs.

use crate::config::{Config, OpenMode, Whence};
use crate::error::{Error, Result};
use crate::session::{Session, State};
use std::net::Shutdown;

#[cfg(unix)]
use std::os::fd::RawFd;

/// A single random-access FTP byte stream (`spec.md` §1/§4.G).
///
/// Construct with [`FtpStream::open`]. Not `Clone`: exactly one `Session` is
/// driven from one thread at a time (`spec.md` §5).
pub struct FtpStream {
    session: Session,
    mode: OpenMode,
    seekable: bool,
}

impl FtpStream {
    /// `open(url, flags)` (`spec.md` §4.E). Parses the URL, opens the
    /// control channel, authenticates, resolves the absolute path via PWD,
    /// and queries SIZE to determine seekability.
    ///
    /// On any error the session is left fully torn down (`spec.md` §7 "side
    /// effects of failure"): both channels closed, state `DISCONNECTED`,
    /// `position = 0`.
    pub fn open(url: &str, mode: OpenMode, config: Config) -> Result<Self> {
        let parsed = url::Url::parse(url)?;
        if parsed.scheme() != "ftp" {
            return Err(Error::InvalidArgument(format!(
                "unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| Error::InvalidArgument("URL has no host".into()))?
            .to_string();

        // Clamp to [0, 65535]; out-of-range reverts to 21 (`spec.md` §4.E
        // step 2). `url::Url::port()` already only ever yields a value in
        // that range or `None`, but an explicit port of 0 is not a usable
        // control port, so it reverts too.
        let control_port = match parsed.port() {
            Some(0) | None => crate::config::DEFAULT_CONTROL_PORT,
            Some(p) => p,
        };

        let user = parsed.username();
        let credentials = match parsed.password() {
            Some(password) => format!("{user}:{password}"),
            None => user.to_string(),
        };

        let url_path = parsed.path().to_string();

        let mut session = Session::new(host, control_port, String::new(), credentials, config.clone());

        let opened: Result<()> = (|| {
            session.connect_control()?;
            let cwd = session.pwd()?;
            session.path = join_remote_path(&cwd, &url_path);

            let path = session.path.clone();
            match session.size(&path) {
                Ok(size) => session.filesize = size,
                Err(_) => session.filesize = -1,
            }
            Ok(())
        })();

        if let Err(e) = opened {
            session.close_both();
            return Err(e);
        }

        let seekable = match mode {
            OpenMode::Read => session.filesize >= 0,
            OpenMode::Write => config.write_seekable,
        };

        Ok(Self { session, mode, seekable })
    }

    /// `read(buf, size)` (`spec.md` §4.F/§4.G). Returns the number of bytes
    /// placed into `buf`, which may be less than `buf.len()` (ordinary
    /// partial-read semantics); `Ok(0)` means end of file.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.mode != OpenMode::Read {
            return Err(Error::Protocol("read() called on a write-mode stream".into()));
        }

        let mut retried = false;
        loop {
            if self.session.state == State::Disconnected {
                self.session.connect_data()?;
            }
            if self.session.state == State::Ready {
                self.session.retr()?;
            }
            if self.session.state != State::Downloading {
                return Err(Error::Protocol("read failed: no active download".into()));
            }

            let n = {
                let data = self
                    .session
                    .data
                    .as_mut()
                    .expect("state Downloading implies a data channel");
                data.read(buf)?
            };
            self.session.position += n as i64;

            if self.session.position >= self.session.filesize {
                // Open Questions (`spec.md` §9 "EOF-at-expected-filesize" and
                // "unconditional EOF check"): unconditional, matching the
                // original's `if (s->position >= s->filesize)` with no
                // `filesize >= 0` guard. For an unsized stream (`filesize ==
                // -1`, SIZE failed) `position >= filesize` holds after every
                // completed read, so this branch fires and the session
                // aborts and reconnects on every call rather than only once
                // at a known end of file. The bytes just read are real and
                // are returned regardless of whether the teardown below
                // succeeds.
                if let Err(e) = self.session.abort() {
                    tracing_warn_teardown(&e);
                }
                return Ok(n);
            }

            if n == 0 && self.seekable && self.session.position < self.session.filesize {
                if retried {
                    return Ok(0);
                }
                retried = true;
                let resume_at = self.session.position;
                self.session.abort()?;
                // Reorders the original's retry-latch placement (`spec.md`
                // §9): reconnect immediately feeds back into the top of
                // this loop, so the retried read happens right after the
                // reconnect instead of on some later call.
                self.session.position = resume_at;
                continue;
            }

            return Ok(n);
        }
    }

    /// `write(buf, size)` (`spec.md` §4.F/§4.G). No reconnect-on-zero logic
    /// on this path; a zero-length write is simply reported as zero bytes.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.mode != OpenMode::Write {
            return Err(Error::Protocol("write() called on a read-mode stream".into()));
        }

        if self.session.state == State::Disconnected {
            self.session.connect_data()?;
        }
        if self.session.state == State::Ready {
            self.session.stor()?;
        }
        if self.session.state != State::Uploading {
            return Err(Error::Protocol("write failed: no active upload".into()));
        }

        let n = {
            let data = self
                .session
                .data
                .as_mut()
                .expect("state Uploading implies a data channel");
            data.write(buf)?
        };
        self.session.position += n as i64;
        self.session.filesize = self.session.filesize.max(self.session.position);
        Ok(n)
    }

    /// `seek(pos, whence)` (`spec.md` §4.F). `Whence::Size` is a pure query
    /// (`spec.md` §8 "seek(AVSEEK_SIZE) is pure"): it never touches
    /// `position`, `state`, or either channel. `Whence::End` additionally
    /// requires a known `filesize`, independently of whether the stream is
    /// otherwise seekable.
    pub fn seek(&mut self, pos: i64, whence: Whence) -> Result<i64> {
        if whence == Whence::Size {
            return Ok(self.session.filesize);
        }

        if whence == Whence::End && self.session.filesize < 0 {
            // Mirrors the original's `case SEEK_END: if (s->filesize < 0)
            // return AVERROR(EIO);`, which fires independently of
            // seekability: a write-mode stream with `write_seekable = true`
            // but an unknown filesize (failed SIZE) must still reject a
            // seek from an end it cannot compute.
            return Err(Error::Protocol("seek from end with unknown file size".into()));
        }

        if !self.seekable {
            return Err(Error::Protocol("seek on a non-seekable stream".into()));
        }

        let raw = match whence {
            Whence::Set => pos,
            Whence::Cur => self.session.position + pos,
            Whence::End => self.session.filesize + pos,
            Whence::Size => unreachable!("handled above"),
        };

        let new_pos = if self.session.filesize >= 0 {
            raw.clamp(0, self.session.filesize)
        } else {
            raw.max(0)
        };

        if new_pos != self.session.position {
            self.session.abort()?;
            self.session.position = new_pos;
        }

        Ok(new_pos)
    }

    /// Cached file size (`spec.md` §4.G `size`); a pure in-memory read, -1
    /// if unknown.
    pub fn size(&self) -> i64 {
        self.session.filesize
    }

    /// `close()` (`spec.md` §4.F): idempotent full teardown.
    pub fn close(&mut self) {
        self.session.close_both();
    }

    /// OS descriptor of the data channel, for multiplex integration
    /// (`spec.md` §4.G passthrough). Fails with *I/O* when no data channel
    /// is open.
    #[cfg(unix)]
    pub fn file_handle(&self) -> Result<RawFd> {
        self.session
            .data
            .as_deref()
            .map(|t| t.file_handle())
            .ok_or_else(|| Error::Protocol("no data channel open".into()))
    }

    /// Half-close of the data channel (`spec.md` §4.G passthrough). Fails
    /// with *I/O* when no data channel is open.
    pub fn shutdown(&mut self, how: Shutdown) -> Result<()> {
        self.session
            .data
            .as_deref_mut()
            .ok_or_else(|| Error::Protocol("no data channel open".into()))?
            .shutdown(how)
            .map_err(Error::Io)
    }
}

/// Concatenates a PWD-reported working directory with the URL's path
/// component (`spec.md` §4.E step 6), avoiding a doubled `/` at the join.
fn join_remote_path(cwd: &str, url_path: &str) -> String {
    if url_path.is_empty() {
        return cwd.to_string();
    }
    if cwd.ends_with('/') && url_path.starts_with('/') {
        format!("{cwd}{}", &url_path[1..])
    } else if !cwd.ends_with('/') && !url_path.starts_with('/') {
        format!("{cwd}/{url_path}")
    } else {
        format!("{cwd}{url_path}")
    }
}

#[cfg(feature = "tracing")]
fn tracing_warn_teardown(e: &Error) {
    tracing::warn!(error = %e, "abort after EOF-at-filesize failed; bytes already read are still returned");
}

#[cfg(not(feature = "tracing"))]
fn tracing_warn_teardown(_e: &Error) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn control_for_anonymous_read() -> MockTransport {
        MockTransport::with_script([
            "220 ready\r\n",
            "331 need password\r\n",
            "230 logged in\r\n",
            "200 binary mode\r\n",
            "257 \"/pub\" is the current directory\r\n",
            "213 10\r\n",
        ])
    }

    fn stream_with(control: MockTransport, mode: OpenMode, config: Config) -> FtpStream {
        let mut session = Session::new("127.0.0.1".to_string(), 21, String::new(), String::new(), config.clone());
        session.control = Some(Box::new(control));
        // Exercises the same sequence `open` runs, without needing a real
        // TCP listener: drive the control handshake directly.
        session.connect_control_for_test().unwrap();
        let cwd = session.pwd().unwrap();
        session.path = join_remote_path(&cwd, "/file");
        let path = session.path.clone();
        session.filesize = session.size(&path).unwrap_or(-1);

        let seekable = match mode {
            OpenMode::Read => session.filesize >= 0,
            OpenMode::Write => config.write_seekable,
        };
        FtpStream { session, mode, seekable }
    }

    #[test]
    fn joins_paths_without_doubling_slash() {
        assert_eq!(join_remote_path("/pub", "/file"), "/pub/file");
        assert_eq!(join_remote_path("/pub/", "/file"), "/pub/file");
        assert_eq!(join_remote_path("/", "/file"), "/file");
    }

    #[test]
    fn anonymous_read_consumes_whole_file() {
        let mut stream = stream_with(control_for_anonymous_read(), OpenMode::Read, Config::default());
        assert_eq!(stream.size(), 10);
        assert!(stream.seekable);

        stream.session.data = Some(Box::new(MockTransport::with_script(["0123456789"])));
        stream.session.state = State::Ready;

        let mut buf = [0u8; 10];
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(n, 10);
        assert_eq!(&buf, b"0123456789");
        // Reaching `position == filesize` aborts unconditionally, which
        // resets `position` to 0 via `close_both` regardless of whether the
        // following reconnect attempt succeeds (Open Question 3: the bytes
        // already read are returned either way).
        assert_eq!(stream.session.position, 0);
        assert_eq!(stream.session.state, State::Disconnected);
    }

    #[test]
    fn seek_size_is_pure() {
        let mut stream = stream_with(control_for_anonymous_read(), OpenMode::Read, Config::default());
        let position_before = stream.session.position;
        let state_before = stream.session.state;
        let result = stream.seek(0, Whence::Size).unwrap();
        assert_eq!(result, 10);
        assert_eq!(stream.session.position, position_before);
        assert_eq!(stream.session.state, state_before);
    }

    #[test]
    fn seek_on_non_seekable_stream_is_protocol_error() {
        let mut config = Config::default();
        config.write_seekable = false;
        let control = MockTransport::with_script([
            "220 ready\r\n",
            "331 need password\r\n",
            "230 logged in\r\n",
            "200 binary mode\r\n",
            "257 \"/pub\" is the current directory\r\n",
            "500 SIZE not understood\r\n",
        ]);
        let mut stream = stream_with(control, OpenMode::Write, config);
        assert!(!stream.seekable);
        assert!(stream.seek(0, Whence::Set).is_err());
    }

    /// End-to-end scenario 4 (`spec.md` §8): authenticated write on a
    /// non-seekable stream. `STOR` primes the data channel and `write`
    /// advances `position`/`filesize`; seeking remains rejected.
    #[test]
    fn write_advances_position_and_filesize() {
        let mut config = Config::default();
        config.write_seekable = false;
        let control = MockTransport::with_script([
            "220 ready\r\n",
            "331 need password\r\n",
            "230 logged in\r\n",
            "200 binary mode\r\n",
            "257 \"/pub\" is the current directory\r\n",
            "500 SIZE not understood\r\n",
        ]);
        let mut stream = stream_with(control, OpenMode::Write, config);
        assert_eq!(stream.size(), -1);

        // Prime the data channel directly in the `Uploading` state: `stor()`
        // itself is already exercised by the protocol-operations tests, so
        // this test isolates `write`'s byte-accounting logic.
        stream.session.data = Some(Box::new(MockTransport::default()));
        stream.session.state = State::Uploading;

        let n = stream.write(b"hello").unwrap();
        assert_eq!(n, 5);
        assert_eq!(stream.session.position, 5);
        assert_eq!(stream.session.filesize, 5);
        assert_eq!(stream.session.state, State::Uploading);

        assert!(stream.seek(0, Whence::Set).is_err());
    }

    /// `Whence::End` rejects an unknown filesize even when the stream is
    /// otherwise seekable (`write_seekable = true` passes the generic
    /// `seekable` gate; the `filesize < 0` check must still fire on its
    /// own).
    #[test]
    fn seek_from_end_with_unknown_filesize_is_protocol_error() {
        let mut config = Config::default();
        config.write_seekable = true;
        let control = MockTransport::with_script([
            "220 ready\r\n",
            "331 need password\r\n",
            "230 logged in\r\n",
            "200 binary mode\r\n",
            "257 \"/pub\" is the current directory\r\n",
            "500 SIZE not understood\r\n",
        ]);
        let mut stream = stream_with(control, OpenMode::Write, config);
        assert!(stream.seekable);
        assert_eq!(stream.size(), -1);

        assert!(stream.seek(0, Whence::End).is_err());
        assert!(stream.seek(0, Whence::Set).is_ok());
    }
}
