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

use std::io::{self, Write};

/// Writes replies to the client.
///
/// Every complete reply is flushed as soon as it is written. Multi-line
/// replies are dot-stuffed and terminated by a line containing only `.`.
pub struct ResponseWriter {
    write: Box<dyn Write>,
}

impl ResponseWriter {
    pub fn new(write: Box<dyn Write>) -> Self {
        ResponseWriter { write }
    }

    /// Write a single-line reply.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        self.write.write_all(text.as_bytes())?;
        self.write.write_all(b"\r\n")?;
        self.write.flush()
    }

    /// Write a complete multi-line reply whose body is `body`.
    pub fn multi_line<'a>(
        &mut self,
        first: &str,
        body: impl IntoIterator<Item = &'a str>,
    ) -> io::Result<()> {
        let mut block = self.begin_block(first)?;
        for line in body {
            block.line(line)?;
        }
        block.finish()
    }

    /// Start a multi-line reply whose body is produced incrementally.
    ///
    /// Nothing is flushed until the returned `Block` is finished.
    pub fn begin_block(&mut self, first: &str) -> io::Result<Block<'_>> {
        self.write.write_all(first.as_bytes())?;
        self.write.write_all(b"\r\n")?;
        Ok(Block {
            write: &mut self.write,
        })
    }
}

/// The body of a multi-line reply in progress.
pub struct Block<'a> {
    write: &'a mut Box<dyn Write>,
}

impl Block<'_> {
    pub fn line(&mut self, line: &str) -> io::Result<()> {
        if line.starts_with('.') {
            self.write.write_all(b".")?;
        }
        self.write.write_all(line.as_bytes())?;
        self.write.write_all(b"\r\n")
    }

    pub fn finish(self) -> io::Result<()> {
        self.write.write_all(b".\r\n")?;
        self.write.flush()
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Rc<RefCell<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    #[test]
    fn single_line() {
        let capture = Capture::default();
        let mut w = ResponseWriter::new(Box::new(capture.clone()));
        w.line("+OK POP3 server ready").unwrap();
        w.line("250 OK").unwrap();
        assert_eq!("+OK POP3 server ready\r\n250 OK\r\n", capture.text());
    }

    #[test]
    fn multi_line_is_dot_stuffed() {
        let capture = Capture::default();
        let mut w = ResponseWriter::new(Box::new(capture.clone()));
        w.multi_line("+OK 12 bytes", vec!["Subject: hi", "", ".", "..x"])
            .unwrap();
        assert_eq!(
            "+OK 12 bytes\r\nSubject: hi\r\n\r\n..\r\n...x\r\n.\r\n",
            capture.text()
        );
    }

    #[test]
    fn empty_multi_line() {
        let capture = Capture::default();
        let mut w = ResponseWriter::new(Box::new(capture.clone()));
        w.multi_line("+OK 0 messages (0 bytes)", Vec::new()).unwrap();
        assert_eq!("+OK 0 messages (0 bytes)\r\n.\r\n", capture.text());
    }
}
