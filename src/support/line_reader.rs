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

use std::io::{self, BufRead, Read};

use crate::support::error::Error;

/// The longest request line accepted, including the line ending.
pub const MAX_LINE: usize = 65536;

/// Reads newline-delimited requests from a client, one line per call.
pub struct LineReader {
    read: Box<dyn BufRead>,
    buf: Vec<u8>,
}

impl LineReader {
    pub fn new(read: Box<dyn BufRead>) -> Self {
        LineReader {
            read,
            buf: Vec::new(),
        }
    }

    /// Read the next line.
    ///
    /// Both DOS and UNIX newlines are accepted, and the line ending is not
    /// included in the result. Invalid UTF-8 is replaced rather than
    /// rejected.
    ///
    /// Returns `Ok(None)` if the peer closed the stream. A final line with no
    /// line ending at all is still returned as a line.
    ///
    /// If the line exceeds `MAX_LINE`, the rest of it is read and discarded
    /// and `Error::LineTooLong` is returned; the reader remains usable.
    pub fn read_line(&mut self) -> Result<Option<String>, Error> {
        self.buf.clear();
        let nread = self
            .read
            .by_ref()
            .take(MAX_LINE as u64)
            .read_until(b'\n', &mut self.buf)?;

        if 0 == nread {
            return Ok(None);
        }

        if !self.buf.ends_with(b"\n") {
            if nread < MAX_LINE {
                // EOF in the middle of a line
                return Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()));
            }

            self.discard_rest_of_line()?;
            return Err(Error::LineTooLong);
        }

        self.buf.pop();
        if self.buf.ends_with(b"\r") {
            self.buf.pop();
        }

        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    fn discard_rest_of_line(&mut self) -> io::Result<()> {
        loop {
            self.buf.clear();
            let nread = self
                .read
                .by_ref()
                .take(MAX_LINE as u64)
                .read_until(b'\n', &mut self.buf)?;
            if 0 == nread || self.buf.ends_with(b"\n") {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reader(data: &[u8]) -> LineReader {
        LineReader::new(Box::new(io::Cursor::new(data.to_vec())))
    }

    #[test]
    fn line_endings() {
        let mut r = reader(b"USER alice\r\nPASS x\n\r\n\nlast");
        assert_eq!(Some("USER alice".to_owned()), r.read_line().unwrap());
        assert_eq!(Some("PASS x".to_owned()), r.read_line().unwrap());
        assert_eq!(Some(String::new()), r.read_line().unwrap());
        assert_eq!(Some(String::new()), r.read_line().unwrap());
        assert_eq!(Some("last".to_owned()), r.read_line().unwrap());
        assert_eq!(None, r.read_line().unwrap());
        assert_eq!(None, r.read_line().unwrap());
    }

    #[test]
    fn empty_stream() {
        assert_eq!(None, reader(b"").read_line().unwrap());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut r = reader(b"NOOP \xFF\r\n");
        assert_eq!(Some("NOOP \u{FFFD}".to_owned()), r.read_line().unwrap());
    }

    #[test]
    fn overlong_line_is_skipped() {
        let mut data = vec![b'x'; MAX_LINE * 2 + 10];
        data.extend_from_slice(b"\r\nNOOP\r\n");
        let mut r = reader(&data);

        assert_matches!(Err(Error::LineTooLong), r.read_line());
        assert_eq!(Some("NOOP".to_owned()), r.read_line().unwrap());
        assert_eq!(None, r.read_line().unwrap());
    }
}
