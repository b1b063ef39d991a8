//! Line Reader (`spec.md` §4.A): buffered, CRLF-terminated reads from the
//! control channel with toggleable non-blocking behavior.

use super::Session;
use crate::config::CONTROL_BUFFER_SIZE;
use crate::error::{Error, Result};
use std::io::ErrorKind;

/// Outcome of one [`Session::read_line`] call. `Interrupted` and `Eof` are
/// internal-only signals — `spec.md` §7 is explicit that `Interrupted`
/// never escapes the stream facade, and EOF on the control channel always
/// becomes a [`Error::Protocol`] at the point it's observed.
pub(crate) enum LineOutcome {
    Line(String),
    Interrupted,
    Eof,
}

impl Session {
    /// Pulls one logical reply line from `control_buf`, refilling from the
    /// transport when the buffer is exhausted.
    ///
    /// Honors `block_flag` only while no character of the current line has
    /// been accumulated yet: once a line is in progress, blocking mode is
    /// forced off for the remainder of this call so a line that's started
    /// always finishes, even if the caller asked for non-blocking polling
    /// (`spec.md` §4.A rationale).
    pub(crate) fn read_line(&mut self) -> Result<LineOutcome> {
        let saved_block_flag = self.block_flag;
        let mut line = String::new();

        loop {
            if self.control_buf_remaining().is_empty() {
                if line.is_empty() && self.block_flag {
                    self.block_flag = saved_block_flag;
                    return Ok(LineOutcome::Interrupted);
                }

                match self.fill_control_buf() {
                    Ok(true) => {}
                    Ok(false) => {
                        self.block_flag = saved_block_flag;
                        return Ok(LineOutcome::Eof);
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {
                        if line.is_empty() {
                            self.block_flag = saved_block_flag;
                            return Ok(LineOutcome::Interrupted);
                        }
                        continue;
                    }
                    Err(e) => {
                        self.block_flag = saved_block_flag;
                        return Err(Error::Io(e));
                    }
                }
                continue;
            }

            let byte = self.control_buf_remaining()[0];
            self.control_buf_advance(1);

            if byte == b'\n' {
                if line.ends_with('\r') {
                    line.pop();
                }
                self.block_flag = saved_block_flag;
                return Ok(LineOutcome::Line(line));
            }

            // A character of the line has been accumulated: the line must
            // finish even if the caller wanted non-blocking reads.
            self.block_flag = false;
            line.push(byte as char);
        }
    }

    /// Requests up to `CONTROL_BUFFER_SIZE` bytes from the control
    /// transport, honoring `self.block_flag`. Returns `Ok(true)` if bytes
    /// were read, `Ok(false)` on transport EOF.
    fn fill_control_buf(&mut self) -> std::io::Result<bool> {
        let control = self
            .control
            .as_mut()
            .expect("fill_control_buf called with no control channel");
        control.set_nonblocking(self.block_flag)?;

        let mut chunk = [0u8; CONTROL_BUFFER_SIZE];
        let n = control.read(&mut chunk)?;
        if n == 0 {
            return Ok(false);
        }
        self.control_buf_refill(&chunk[..n]);
        Ok(true)
    }
}
