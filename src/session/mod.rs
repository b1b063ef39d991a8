//! [`Session`]: the root entity (`spec.md` §3) plus the Connection Manager
//! (`spec.md` §4.E) primitives that own control/data channel lifecycle.
//!
//! Framing (component A/B), command dispatch (component C), and the
//! protocol verbs (component D) live in sibling modules as further `impl
//! Session` blocks, mirroring the teacher's `base/context.rs` split between
//! "internal API" and "external API" on one type.

mod command;
mod line;
mod ops;

use crate::config::{CONTROL_BUFFER_SIZE, Config};
use crate::error::{Error, Result};
use crate::transport::{TcpTransport, Transport};
use bytes::BytesMut;

/// Transfer state (`spec.md` §3/§4.F). Plain tagged enum with no per-variant
/// data: every stream operation matches exhaustively on it and refuses
/// illegal transitions with [`Error::Protocol`] (`spec.md` §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Unknown,
    Ready,
    Downloading,
    Uploading,
    Disconnected,
}

/// Root session entity. Owns both channels, the control read buffer, and
/// the `block_flag` cancellation bit shared between the line reader and
/// whatever drove the most recent blocking read.
pub(crate) struct Session {
    pub(crate) control: Option<Box<dyn Transport>>,
    pub(crate) data: Option<Box<dyn Transport>>,
    control_buf: BytesMut,
    /// Read cursor into `control_buf`; bytes before this index are already
    /// consumed by a prior `read_line`.
    control_buf_pos: usize,
    /// `true` => a read of the control channel should not block past "no
    /// data currently available"; `false` => block up to the transport's
    /// configured timeout. See `spec.md` §4.A/§9.
    pub(crate) block_flag: bool,

    pub(crate) host: String,
    pub(crate) control_port: u16,
    pub(crate) path: String,
    pub(crate) credentials: String,

    pub(crate) data_port: i32,
    pub(crate) filesize: i64,
    pub(crate) position: i64,
    pub(crate) state: State,

    pub(crate) config: Config,
}

impl Session {
    pub(crate) fn new(host: String, control_port: u16, path: String, credentials: String, config: Config) -> Self {
        Self {
            control: None,
            data: None,
            control_buf: BytesMut::with_capacity(CONTROL_BUFFER_SIZE),
            control_buf_pos: 0,
            block_flag: false,
            host,
            control_port,
            path,
            credentials,
            data_port: -1,
            filesize: -1,
            position: 0,
            state: State::Disconnected,
            config,
        }
    }

    pub(crate) fn control_buf_remaining(&self) -> &[u8] {
        &self.control_buf[self.control_buf_pos..]
    }

    pub(crate) fn control_buf_advance(&mut self, n: usize) {
        self.control_buf_pos += n;
    }

    pub(crate) fn control_buf_refill(&mut self, chunk: &[u8]) {
        self.control_buf.clear();
        self.control_buf.extend_from_slice(chunk);
        self.control_buf_pos = 0;
    }

    /// Opens the control channel and runs the banner + auth + TYPE
    /// sequence (`spec.md` §4.E steps 3-5). Only connects if `control` is
    /// absent, matching the original's guard in
    /// `ftp_connect_control_connection`.
    pub(crate) fn connect_control(&mut self) -> Result<()> {
        if self.control.is_some() {
            return Ok(());
        }

        let transport = TcpTransport::connect(&self.host, self.control_port, self.config.timeout)?;
        self.control = Some(Box::new(transport));
        self.run_control_handshake()
    }

    /// Banner + authenticate + `TYPE I` sequence (`spec.md` §4.E steps 3-5),
    /// shared between `connect_control` and the test-only entry point that
    /// drives it over an already-installed mock transport.
    fn run_control_handshake(&mut self) -> Result<()> {
        self.block_flag = false;
        self.control_buf.clear();
        self.control_buf_pos = 0;

        if self.status(&[220]).0 == 0 {
            self.control = None;
            return Err(Error::AccessDenied(
                "FTP server not ready for new users".into(),
            ));
        }

        self.authenticate()?;
        self.type_i()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn connect_control_for_test(&mut self) -> Result<()> {
        self.run_control_handshake()
    }

    /// Test-only stand-in for the data-connection half of `connect_data`:
    /// runs PASV (and REST, when resuming) over whatever control transport
    /// is already installed, then installs `transport` directly instead of
    /// dialing a real socket.
    #[cfg(test)]
    pub(crate) fn connect_data_for_test(&mut self, transport: Box<dyn Transport>) -> Result<()> {
        if self.data.is_some() {
            return Ok(());
        }

        self.pasv()?;
        if self.data_port < 0 {
            return Err(Error::Protocol("PASV did not yield a data port".into()));
        }

        self.data = Some(transport);
        if self.position > 0 {
            self.rest(self.position)?;
        }

        self.state = State::Ready;
        Ok(())
    }

    /// Opens the data channel if absent: `PASV`, connect, `REST` if
    /// resuming (`spec.md` §4.E `connect_data`).
    pub(crate) fn connect_data(&mut self) -> Result<()> {
        if self.data.is_some() {
            return Ok(());
        }

        self.pasv()?;
        if self.data_port < 0 {
            return Err(Error::Protocol("PASV did not yield a data port".into()));
        }

        let transport = TcpTransport::connect(&self.host, self.data_port as u16, self.config.timeout)?;
        self.data = Some(Box::new(transport));

        if self.position > 0 {
            self.rest(self.position)?;
        }

        self.state = State::Ready;
        Ok(())
    }

    /// Closes both channels and resets position/state (`spec.md` §4.E
    /// `close_both`). Idempotent: calling this with both channels already
    /// absent is a no-op besides the state reset.
    pub(crate) fn close_both(&mut self) {
        if let Some(mut data) = self.data.take() {
            let _ = data.close();
        }
        if let Some(mut control) = self.control.take() {
            let _ = control.close();
        }
        self.position = 0;
        self.state = State::Disconnected;
    }

    /// Recovery primitive (`spec.md` §4.E `abort`): full teardown followed
    /// by reopening and reauthenticating control only. `close_both` resets
    /// `position` to 0; callers that need to resume elsewhere (seek, the
    /// mid-download reconnect) explicitly set `position` right after
    /// calling this, matching the original's `ftp_abort` + explicit
    /// `s->position = new_pos` pairing.
    pub(crate) fn abort(&mut self) -> Result<()> {
        self.close_both();
        self.connect_control()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn session_with_control(control: MockTransport) -> Session {
        let mut session = Session::new(
            "127.0.0.1".to_string(),
            21,
            String::new(),
            String::new(),
            Config::default(),
        );
        session.control = Some(Box::new(control));
        session
    }

    /// End-to-end scenario 6 (`spec.md` §8): banner rejection. No 220 is
    /// ever seen, so `open` must surface *access-denied* with the control
    /// channel torn back down.
    #[test]
    fn banner_rejection_is_access_denied() {
        let mut session = session_with_control(MockTransport::with_script(["421 too many users\r\n"]));

        let err = session.connect_control_for_test().unwrap_err();
        assert!(matches!(err, Error::AccessDenied(_)));
        assert!(session.control.is_none());
    }

    /// End-to-end scenario 5: bad credentials. `USER` succeeds (331), but
    /// `PASS` is rejected with 530; the command engine reports no accepted
    /// code, which `authenticate` maps to *access-denied*.
    #[test]
    fn bad_password_is_access_denied() {
        let mut session = session_with_control(MockTransport::with_script([
            "220 ready\r\n",
            "331 need password\r\n",
            "530 login incorrect\r\n",
        ]));
        session.credentials = "u:p".to_string();

        let err = session.connect_control_for_test().unwrap_err();
        assert!(matches!(err, Error::AccessDenied(_)));
    }

    /// `connect_data_for_test` issues `REST <position>` when resuming a
    /// nonzero offset, exercising the same branch `connect_data` takes
    /// after a reconnect (`spec.md` §4.E `connect_data`).
    #[test]
    fn connect_data_issues_rest_when_resuming() {
        let mut session = session_with_control(MockTransport::with_script([
            "227 Entering Passive Mode (127,0,0,1,200,10)\r\n",
            "350 restart point set\r\n",
        ]));
        session.position = 4;

        session.connect_data_for_test(Box::new(MockTransport::default())).unwrap();

        assert_eq!(session.data_port, 51210);
        assert_eq!(session.state, State::Ready);
        assert!(session.data.is_some());
    }
}
