//! Command Engine (`spec.md` §4.C): send a command, drain stale input
//! first, collect the response, match against caller-supplied acceptable
//! codes.

use super::Session;
use super::line::LineOutcome;
use crate::config::{STATUS_POLL_ATTEMPTS, STATUS_POLL_INTERVAL};
use crate::error::Result;
use crate::reply::parse_reply_code;
use std::thread::sleep;

impl Session {
    /// Pre-drain: discards any stale lines left over from a prior reply
    /// (`spec.md` §4.C step 1). Runs in forced non-blocking mode so it
    /// stops as soon as no more data is immediately available.
    fn pre_drain(&mut self) -> Result<()> {
        self.block_flag = true;
        loop {
            match self.read_line()? {
                LineOutcome::Interrupted => return Ok(()),
                LineOutcome::Eof => return Ok(()),
                LineOutcome::Line(line) => {
                    tracing_trace(&line);
                }
            }
        }
    }

    /// The status/receive loop (`spec.md` §4.C step 3): first iteration
    /// blocking, subsequent iterations non-blocking, collecting lines until
    /// a matching code has been seen and the input is drained, or the
    /// 100x10ms polling ceiling is reached without ever matching.
    pub(crate) fn status(&mut self, accepted: &[u16]) -> Result<(u16, String)> {
        let mut matched: Option<(u16, String)> = None;
        let mut first_iteration = true;
        let mut wait_count = STATUS_POLL_ATTEMPTS;

        loop {
            self.block_flag = !first_iteration;
            first_iteration = false;

            match self.read_line()? {
                LineOutcome::Line(line) => {
                    tracing_trace(&line);
                    if matched.is_none() {
                        if let Some(code) = parse_reply_code(&line) {
                            if accepted.contains(&code) {
                                matched = Some((code, line));
                            }
                        }
                    }
                }
                LineOutcome::Eof => {
                    return Ok(matched.unwrap_or((0, String::new())));
                }
                LineOutcome::Interrupted => {
                    if matched.is_some() {
                        return Ok(matched.unwrap());
                    }
                    if wait_count == 0 {
                        return Ok((0, String::new()));
                    }
                    wait_count -= 1;
                    sleep(STATUS_POLL_INTERVAL);
                }
            }
        }
    }

    /// `send()` in `spec.md` §4.C: pre-drain, send the command bytes,
    /// collect the response.
    pub(crate) fn command(&mut self, command: &str, accepted: &[u16]) -> Result<(u16, String)> {
        self.pre_drain()?;

        self.block_flag = false;
        let control = self
            .control
            .as_mut()
            .expect("command() called with no control channel");
        control.set_nonblocking(false)?;
        control.write_all(command.as_bytes())?;

        self.status(accepted)
    }
}

#[cfg(feature = "tracing")]
fn tracing_trace(line: &str) {
    tracing::trace!(%line, "control reply line");
}

#[cfg(not(feature = "tracing"))]
fn tracing_trace(_line: &str) {}
