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

/// Determine whether the given mail address is "safe" to use as the name of
/// a mailbox directory.
///
/// This excludes empty names and anything that could escape the mailbox
/// root or create hidden files. It does not check that the name looks like
/// an email address; the users file is trusted for that.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty() &&
        // Block directory traversal through .. and hidden files on UNIX; a
        // leading . is also how staged deliveries are kept out of listings
        name.chars().next() != Some('.') &&
        name.find('/').is_none() &&
        name.find('\\').is_none() &&
        // Control characters would also break the log prefix
        name.find(|c| c < ' ' || c == '\x7F').is_none()
}

#[cfg(test)]
mod test {
    use super::is_safe_name;

    #[test]
    fn test_is_safe_name() {
        assert!(is_safe_name("alice@example.com"));
        assert!(is_safe_name("bob"));
        assert!(is_safe_name("jürgen@example.de"));
        assert!(is_safe_name("first.last@example.com"));
        assert!(!is_safe_name(""));
        assert!(!is_safe_name("."));
        assert!(!is_safe_name(".."));
        assert!(!is_safe_name(".staging"));
        assert!(!is_safe_name("alice/../bob"));
        assert!(!is_safe_name("/etc"));
        assert!(!is_safe_name("alice\\bob"));
        assert!(!is_safe_name("alice\0"));
        assert!(!is_safe_name("alice\r"));
        assert!(!is_safe_name("al\x7Fice"));
    }
}
