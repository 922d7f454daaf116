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

use crate::support::tokenise::lookup_verb;

/// A POP3 command verb.
///
/// Commands which need an open mailbox are grouped under `Verb::Mailbox` so
/// that the session can only dispatch them once it has a mailbox to give
/// them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    /// USER name
    User,
    /// PASS password
    Pass,
    /// NOOP
    Noop,
    /// QUIT
    Quit,
    Mailbox(MailboxVerb),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailboxVerb {
    /// STAT
    Stat,
    /// LIST [msg]
    List,
    /// DELE msg
    Dele,
    /// RSET
    Rset,
    /// RETR msg
    Retr,
}

static VERBS: &[(&str, Verb)] = &[
    ("USER", Verb::User),
    ("PASS", Verb::Pass),
    ("NOOP", Verb::Noop),
    ("QUIT", Verb::Quit),
    ("STAT", Verb::Mailbox(MailboxVerb::Stat)),
    ("LIST", Verb::Mailbox(MailboxVerb::List)),
    ("DELE", Verb::Mailbox(MailboxVerb::Dele)),
    ("RSET", Verb::Mailbox(MailboxVerb::Rset)),
    ("RETR", Verb::Mailbox(MailboxVerb::Retr)),
];

impl FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        lookup_verb(VERBS, s).ok_or(())
    }
}

/// Parse a message ordinal argument.
///
/// Only plain decimal digits are accepted. Range checking is left to the
/// mailbox.
pub fn parse_ordinal(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    s.parse().ok()
}
