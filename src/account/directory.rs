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

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::warn;

use crate::support::error::Error;
use crate::support::safe_name::is_safe_name;

/// The registry of known mail addresses.
///
/// This is loaded once from the users file and never modified afterwards,
/// so it can be shared freely between sessions.
///
/// Each line of the users file holds an address, optionally followed by a
/// space and the password for that mailbox. Blank lines and lines starting
/// with `#` are ignored. Addresses are matched case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct Directory {
    entries: HashMap<String, Entry>,
}

#[derive(Clone, Debug)]
pub struct Entry {
    /// The address as written in the users file. This is also the name of
    /// the mailbox directory.
    pub address: String,
    password: Option<String>,
}

impl Entry {
    pub fn check_password(&self, password: &str) -> bool {
        self.password.as_deref() == Some(password)
    }
}

impl Directory {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read(path)?;
        Ok(Self::parse(&String::from_utf8_lossy(&text)))
    }

    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();

        for line in text.lines() {
            let mut fields = line.split_whitespace();
            let address = match fields.next() {
                Some(a) if !a.starts_with('#') => a,
                _ => continue,
            };

            if !is_safe_name(address) {
                warn!("Ignoring unsafe address in users file: {:?}", address);
                continue;
            }

            entries
                .entry(address.to_lowercase())
                .or_insert_with(|| Entry {
                    address: address.to_owned(),
                    password: fields.next().map(str::to_owned),
                });
        }

        Directory { entries }
    }

    pub fn lookup(&self, address: &str) -> Option<&Entry> {
        self.entries.get(&address.to_lowercase())
    }

    pub fn contains(&self, address: &str) -> bool {
        self.lookup(address).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const USERS: &str = "\
alice@example.com secret
Bob@Example.com hunter2

# carol@example.com commented
dave@example.com
../escape@example.com pw
alice@example.com duplicate
";

    #[test]
    fn parsing() {
        let dir = Directory::parse(USERS);
        assert_eq!(3, dir.len());

        assert!(dir.contains("alice@example.com"));
        assert!(dir.contains("ALICE@example.COM"));
        assert!(dir.contains("bob@example.com"));
        assert!(dir.contains("dave@example.com"));
        assert!(!dir.contains("carol@example.com"));
        assert!(!dir.contains("#"));
        assert!(!dir.contains("../escape@example.com"));
        assert!(!dir.contains("alice"));
    }

    #[test]
    fn canonical_address() {
        let dir = Directory::parse(USERS);
        assert_eq!(
            "Bob@Example.com",
            dir.lookup("bob@example.com").unwrap().address
        );
    }

    #[test]
    fn passwords() {
        let dir = Directory::parse(USERS);
        let alice = dir.lookup("alice@example.com").unwrap();
        assert!(alice.check_password("secret"));
        assert!(!alice.check_password("duplicate"));
        assert!(!alice.check_password("Secret"));
        assert!(!alice.check_password(""));

        // No password means no login, but still a valid recipient
        let dave = dir.lookup("dave@example.com").unwrap();
        assert!(!dave.check_password(""));
    }

    #[test]
    fn load_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert_matches!(
            Err(Error::Io(_)),
            Directory::load(&tmp.path().join("users.txt"))
        );
    }
}
