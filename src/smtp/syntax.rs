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

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::support::tokenise::lookup_verb;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    /// HELO domain or EHLO domain
    Hello,
    /// VRFY address
    Verify,
    /// MAIL FROM:<reverse-path>
    Mail,
    /// RCPT TO:<forward-path>
    Recipient,
    /// DATA
    Data,
    /// RSET
    Reset,
    /// NOOP
    Noop,
    /// QUIT
    Quit,
}

static VERBS: &[(&str, Verb)] = &[
    ("HELO", Verb::Hello),
    ("EHLO", Verb::Hello),
    ("VRFY", Verb::Verify),
    ("MAIL", Verb::Mail),
    ("RCPT", Verb::Recipient),
    ("DATA", Verb::Data),
    ("RSET", Verb::Reset),
    ("NOOP", Verb::Noop),
    ("QUIT", Verb::Quit),
];

impl FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        lookup_verb(VERBS, s).ok_or(())
    }
}

lazy_static! {
    static ref RX_FROM: Regex = Regex::new("^(?i)FROM:<(.*)>$").unwrap();
    static ref RX_TO: Regex = Regex::new("^(?i)TO:<(.*)>$").unwrap();
}

/// Extract the reverse path from the argument of MAIL, which must be exactly
/// `FROM:<...>`.
pub fn parse_mail_from(arg: &str) -> Option<&str> {
    RX_FROM
        .captures(arg)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// Extract the forward path from the argument of RCPT, which must be exactly
/// `TO:<...>`.
pub fn parse_rcpt_to(arg: &str) -> Option<&str> {
    RX_TO
        .captures(arg)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verb_parsing() {
        assert_eq!(Ok(Verb::Hello), "HELO".parse());
        assert_eq!(Ok(Verb::Hello), "ehlo".parse());
        assert_eq!(Ok(Verb::Recipient), "Rcpt".parse());
        assert_eq!(Ok(Verb::Data), "DATA".parse());
        assert_eq!(Err(()), "DATABASE".parse::<Verb>());
        assert_eq!(Err(()), "EXPN".parse::<Verb>());
        assert_eq!(Err(()), "STARTTLS".parse::<Verb>());
    }

    #[test]
    fn envelope_parsing() {
        assert_eq!(Some("a@x.com"), parse_mail_from("FROM:<a@x.com>"));
        assert_eq!(Some("a@x.com"), parse_mail_from("from:<a@x.com>"));
        assert_eq!(Some(""), parse_mail_from("FROM:<>"));
        assert_eq!(Some("A@X.com"), parse_mail_from("From:<A@X.com>"));
        assert_eq!(None, parse_mail_from("FROM:a@x.com"));
        assert_eq!(None, parse_mail_from("FROM:<a@x.com"));
        assert_eq!(None, parse_mail_from("FROM:<a@x.com>x"));
        assert_eq!(None, parse_mail_from("TO:<a@x.com>"));
        assert_eq!(None, parse_mail_from("XFROM:<a@x.com>"));

        assert_eq!(Some("b@y.com"), parse_rcpt_to("TO:<b@y.com>"));
        assert_eq!(Some("b@y.com"), parse_rcpt_to("to:<b@y.com>"));
        // Content is taken verbatim
        assert_eq!(Some("<b@y.com"), parse_rcpt_to("TO:<<b@y.com>"));
        assert_eq!(None, parse_rcpt_to("TO:b@y.com"));
        assert_eq!(None, parse_rcpt_to("FROM:<b@y.com>"));
    }
}
