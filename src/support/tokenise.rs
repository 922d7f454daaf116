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

/// A request line split into its verb and arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tokens<'a> {
    pub verb: &'a str,
    pub args: Vec<&'a str>,
}

/// Split `line` on whitespace into a verb and zero or more arguments.
///
/// Returns `None` for a blank line.
pub fn tokenise(line: &str) -> Option<Tokens<'_>> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    Some(Tokens {
        verb,
        args: words.collect(),
    })
}

/// Find `verb` in `table`, ignoring ASCII case.
pub fn lookup_verb<T: Copy>(table: &[(&str, T)], verb: &str) -> Option<T> {
    table
        .iter()
        .find(|&&(name, _)| name.eq_ignore_ascii_case(verb))
        .map(|&(_, v)| v)
}
