//-
// Copyright (c) 2026, Jason Lingle
//
// This file is part of Duomail.
//
// Duomail is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Duomail is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Duomail. If not, see <http://www.gnu.org/licenses/>.

use std::fmt;

/// Tracks text that should be included at the start of every log statement
/// made on behalf of one session.
#[derive(Clone, Debug)]
pub struct LogPrefix {
    protocol: &'static str,
    peer: String,
    user: Option<String>,
    helo: Option<String>,
}

impl LogPrefix {
    pub fn new(protocol: &'static str, peer: String) -> Self {
        Self {
            protocol,
            peer: sanitise(peer),
            user: None,
            helo: None,
        }
    }

    pub fn set_user(&mut self, user: String) {
        self.user = Some(sanitise(user));
    }

    pub fn set_helo(&mut self, helo: String) {
        self.helo = Some(sanitise(helo));
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.protocol, self.peer)?;
        match (&self.user, &self.helo) {
            (None, None) => Ok(()),
            (Some(user), None) => write!(f, "[{}]", user),
            (None, Some(helo)) => write!(f, "[helo={}]", helo),
            (Some(user), Some(helo)) => {
                write!(f, "[{} helo={}]", user, helo)
            }
        }
    }
}

fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn formatting() {
        let mut prefix = LogPrefix::new("pop3", "127.0.0.1:1234".to_owned());
        assert_eq!("pop3:127.0.0.1:1234", prefix.to_string());

        prefix.set_user("alice@example.com".to_owned());
        assert_eq!(
            "pop3:127.0.0.1:1234[alice@example.com]",
            prefix.to_string()
        );

        let mut prefix = LogPrefix::new("smtp", "peer".to_owned());
        prefix.set_helo("client.example".to_owned());
        assert_eq!("smtp:peer[helo=client.example]", prefix.to_string());
    }

    #[test]
    fn sanitisation() {
        let mut prefix = LogPrefix::new("smtp", "peer".to_owned());
        prefix.set_helo("evil\r\nINFO forged".to_owned());
        assert_eq!("smtp:peer[helo=evilINFO forged]", prefix.to_string());

        prefix.set_helo("x".repeat(100));
        assert_eq!(
            format!("smtp:peer[helo={}]", "x".repeat(64)),
            prefix.to_string()
        );
    }
}
