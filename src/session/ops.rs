//! Protocol Operations (`spec.md` §4.D): thin, typed wrappers over the
//! command engine, one per FTP verb this client uses.

use super::{Session, State};
use crate::error::{Error, Result};

impl Session {
    /// Authentication algorithm (`spec.md` §4.D "D-USER"). Splits the raw
    /// `user:password` credentials substring, falling back to anonymous
    /// login when no user is present.
    pub(crate) fn authenticate(&mut self) -> Result<()> {
        let (user, password) = split_credentials(&self.credentials, self.config.anonymous_password());

        let (code, _) = self.command(&format!("USER {user}\r\n"), &[331, 230])?;
        match code {
            // Open Question 2 (spec.md §9): 230 directly on USER is success,
            // full stop — no PASS is sent and no later guard reinterprets
            // it as a failure.
            230 => Ok(()),
            331 => {
                let password = password.ok_or_else(|| {
                    Error::AccessDenied("server requires a password but none was supplied".into())
                })?;
                let (code, _) = self.command(&format!("PASS {password}\r\n"), &[230])?;
                if code == 0 {
                    return Err(Error::AccessDenied("PASS rejected".into()));
                }
                Ok(())
            }
            _ => Err(Error::AccessDenied("USER rejected".into())),
        }
    }

    pub(crate) fn type_i(&mut self) -> Result<()> {
        let (code, _) = self.command("TYPE I\r\n", &[200])?;
        if code == 0 {
            return Err(Error::Protocol("TYPE I rejected".into()));
        }
        Ok(())
    }

    /// `PASV` (`spec.md` §4.D "PASV parsing"). On a malformed reply,
    /// `data_port` is set to -1 and an `I/O`-class error is returned.
    pub(crate) fn pasv(&mut self) -> Result<()> {
        let (code, line) = self.command("PASV\r\n", &[227])?;
        if code == 0 {
            self.data_port = -1;
            return Err(Error::Protocol("PASV rejected".into()));
        }

        match parse_pasv_port(&line) {
            Some(port) => {
                self.data_port = port as i32;
                Ok(())
            }
            None => {
                self.data_port = -1;
                Err(Error::Protocol(format!("malformed PASV reply: {line}")))
            }
        }
    }

    /// `PWD` (`spec.md` §4.D "PWD parsing"). Leaves `path` untouched on a
    /// malformed reply.
    pub(crate) fn pwd(&mut self) -> Result<String> {
        let (code, line) = self.command("PWD\r\n", &[257])?;
        if code == 0 {
            return Err(Error::Protocol("PWD rejected".into()));
        }
        parse_pwd_path(&line).ok_or_else(|| Error::Protocol(format!("malformed PWD reply: {line}")))
    }

    /// `SIZE` (`spec.md` §4.D). Parses a decimal filesize starting at byte
    /// 4 of the reply (`"213 12345"`).
    pub(crate) fn size(&mut self, path: &str) -> Result<i64> {
        let (code, line) = self.command(&format!("SIZE {path}\r\n"), &[213])?;
        if code == 0 {
            return Err(Error::Protocol("SIZE rejected".into()));
        }
        line.get(4..)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| Error::Protocol(format!("malformed SIZE reply: {line}")))
    }

    pub(crate) fn rest(&mut self, position: i64) -> Result<()> {
        let (code, _) = self.command(&format!("REST {position}\r\n"), &[350])?;
        if code == 0 {
            return Err(Error::Protocol("REST rejected".into()));
        }
        Ok(())
    }

    pub(crate) fn retr(&mut self) -> Result<()> {
        let path = self.path.clone();
        let (code, _) = self.command(&format!("RETR {path}\r\n"), &[150])?;
        if code == 0 {
            return Err(Error::Protocol("RETR rejected".into()));
        }
        self.state = State::Downloading;
        Ok(())
    }

    pub(crate) fn stor(&mut self) -> Result<()> {
        let path = self.path.clone();
        let (code, _) = self.command(&format!("STOR {path}\r\n"), &[150])?;
        if code == 0 {
            return Err(Error::Protocol("STOR rejected".into()));
        }
        self.state = State::Uploading;
        Ok(())
    }
}

/// Splits the raw `user:password` credentials substring on `:`. An empty or
/// missing user resolves to anonymous login using `anonymous_password`.
fn split_credentials<'a>(credentials: &'a str, anonymous_password: &'a str) -> (&'a str, Option<&'a str>) {
    let mut parts = credentials.splitn(2, ':');
    let user = parts.next().unwrap_or("");
    let password = parts.next();

    if user.is_empty() {
        (user_anonymous(), Some(anonymous_password))
    } else {
        (user, password)
    }
}

fn user_anonymous() -> &'static str {
    "anonymous"
}

/// Parses the `h1,h2,h3,h4,p1,p2` sextuple out of a `227 (…)` reply,
/// returning `p1*256 + p2`. The host quartet is discarded: the control
/// channel's own host is reused for the data connection.
fn parse_pasv_port(line: &str) -> Option<u16> {
    let start = line.find('(')?;
    let end = line[start + 1..].find(')')? + start + 1;
    let fields: Vec<&str> = line[start + 1..end].split(',').collect();
    if fields.len() != 6 {
        return None;
    }
    let p1: u16 = fields[4].trim().parse().ok()?;
    let p2: u16 = fields[5].trim().parse().ok()?;
    Some(p1.wrapping_mul(256).wrapping_add(p2))
}

/// Parses the quoted path out of a `257 "/pub" …` reply. If the path ends
/// with `/`, strip exactly one trailing slash — except when that would
/// leave an empty string, in which case the path (`"/"`) is kept as-is
/// (Open Question 1, `spec.md` §9).
fn parse_pwd_path(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let rest = &line[start + 1..];
    let end = rest.find('"')?;
    let path = &rest[..end];

    if path.len() > 1 && path.ends_with('/') {
        Some(path[..path.len() - 1].to_string())
    } else {
        Some(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_user_and_password() {
        assert_eq!(split_credentials("alice:secret", "nopassword"), ("alice", Some("secret")));
    }

    #[test]
    fn missing_user_falls_back_to_anonymous() {
        assert_eq!(split_credentials("", "me@example.com"), ("anonymous", Some("me@example.com")));
    }

    #[test]
    fn user_without_password() {
        assert_eq!(split_credentials("alice", "nopassword"), ("alice", None));
    }

    #[test]
    fn parses_pasv_reply() {
        assert_eq!(parse_pasv_port("227 Entering Passive Mode (127,0,0,1,200,10)"), Some(51210));
    }

    #[test]
    fn malformed_pasv_reply_has_no_port() {
        assert_eq!(parse_pasv_port("227 Entering Passive Mode 127,0,0,1,200,10"), None);
        assert_eq!(parse_pasv_port("227 ()"), None);
    }

    #[test]
    fn parses_pwd_reply_stripping_trailing_slash() {
        assert_eq!(parse_pwd_path("257 \"/pub/\" is the current directory"), Some("/pub".to_string()));
        assert_eq!(parse_pwd_path("257 \"/pub\" is the current directory"), Some("/pub".to_string()));
    }

    #[test]
    fn root_pwd_reply_keeps_single_slash() {
        assert_eq!(parse_pwd_path("257 \"/\" is the current directory"), Some("/".to_string()));
    }

    #[test]
    fn malformed_pwd_reply_has_no_path() {
        assert_eq!(parse_pwd_path("257 no quotes here"), None);
    }
}
