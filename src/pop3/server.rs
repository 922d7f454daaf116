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

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, info, warn};

use super::syntax::{parse_ordinal, MailboxVerb, Verb};
use crate::account::directory::Directory;
use crate::account::mailbox::Mailbox;
use crate::support::error::Error;
use crate::support::line_reader::LineReader;
use crate::support::log_prefix::LogPrefix;
use crate::support::response_writer::ResponseWriter;
use crate::support::tokenise::{tokenise, Tokens};

/// Where a retrieval session is in its lifecycle.
///
/// The mailbox only exists in the transaction phase, so it is bound exactly
/// when the client has logged in.
#[derive(Debug)]
enum Phase {
    Authorization { pending_user: Option<String> },
    Transaction(Mailbox),
}

/// A single POP3 session.
pub struct Server {
    reader: LineReader,
    writer: ResponseWriter,
    directory: Arc<Directory>,
    mailbox_root: PathBuf,
    log_prefix: LogPrefix,
    phase: Phase,
    quit: bool,
}

impl Server {
    pub fn new(
        read: Box<dyn BufRead>,
        write: Box<dyn Write>,
        directory: Arc<Directory>,
        mailbox_root: PathBuf,
        log_prefix: LogPrefix,
    ) -> Self {
        Server {
            reader: LineReader::new(read),
            writer: ResponseWriter::new(write),
            directory,
            mailbox_root,
            log_prefix,
            phase: Phase::Authorization { pending_user: None },
            quit: false,
        }
    }

    /// Run the session.
    ///
    /// Blocks until the client quits or disconnects, both of which return
    /// `Ok`. An `Err` means the connection itself failed.
    pub fn run(&mut self) -> Result<(), Error> {
        self.writer.line("+OK POP3 server ready")?;

        while !self.quit {
            let line = match self.reader.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("{} EOF without QUIT", self.log_prefix);
                    return Ok(());
                }
                Err(Error::LineTooLong) => {
                    self.writer.line("-ERR line too long")?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(tokens) = tokenise(&line) {
                self.handle_command(tokens)?;
            }
        }

        Ok(())
    }

    fn handle_command(&mut self, tokens: Tokens<'_>) -> Result<(), Error> {
        let verb = match tokens.verb.parse::<Verb>() {
            Ok(verb) => verb,
            Err(()) => {
                debug!("{} Unrecognised command", self.log_prefix);
                self.writer.line("-ERR unrecognised command")?;
                return Ok(());
            }
        };
        let args = &tokens.args[..];
        debug!("{} Command {:?}", self.log_prefix, verb);

        let mailbox_verb = match verb {
            Verb::User => return self.cmd_user(args),
            Verb::Pass => return self.cmd_pass(args),
            Verb::Noop => {
                self.writer.line("+OK")?;
                return Ok(());
            }
            Verb::Quit => return self.cmd_quit(),
            Verb::Mailbox(v) => v,
        };

        let mailbox = match self.phase {
            Phase::Transaction(ref mut mailbox) => mailbox,
            Phase::Authorization { .. } => {
                self.writer.line("-ERR please log in")?;
                return Ok(());
            }
        };
        let w = &mut self.writer;

        match mailbox_verb {
            MailboxVerb::Stat => cmd_stat(w, mailbox),
            MailboxVerb::List => cmd_list(w, mailbox, args),
            MailboxVerb::Dele => cmd_dele(w, mailbox, args),
            MailboxVerb::Rset => cmd_rset(w, mailbox),
            MailboxVerb::Retr => cmd_retr(w, mailbox, args, &self.log_prefix),
        }
    }

    fn cmd_user(&mut self, args: &[&str]) -> Result<(), Error> {
        if let Phase::Transaction(_) = self.phase {
            self.writer.line("-ERR already logged in")?;
            return Ok(());
        }

        let accepted = match *args {
            [name] if self.directory.contains(name) => Some(name.to_owned()),
            _ => None,
        };

        let response = match accepted {
            Some(ref name) => format!("+OK {} is a valid mailbox", name),
            None if args.is_empty() => "-ERR not a valid mailbox".to_owned(),
            None => format!("-ERR {} is not a valid mailbox", args.join(" ")),
        };

        self.phase = Phase::Authorization {
            pending_user: accepted,
        };
        self.writer.line(&response)?;
        Ok(())
    }

    fn cmd_pass(&mut self, args: &[&str]) -> Result<(), Error> {
        let pending_user = match self.phase {
            Phase::Transaction(_) => {
                self.writer.line("-ERR already logged in")?;
                return Ok(());
            }
            Phase::Authorization { ref pending_user } => pending_user.clone(),
        };

        let password = match *args {
            [password] => password,
            _ => {
                self.writer.line("-ERR PASS must have a single argument")?;
                return Ok(());
            }
        };

        let user = match pending_user {
            Some(user) => user,
            None => {
                self.writer
                    .line("-ERR no mailbox selected, send USER first")?;
                return Ok(());
            }
        };

        match Mailbox::open(
            &self.directory,
            &self.mailbox_root,
            &user,
            password,
        ) {
            Ok(mailbox) => {
                self.log_prefix.set_user(mailbox.user().to_owned());
                info!("{} Login successful", self.log_prefix);

                let response =
                    format!("+OK {} has {} messages", user, mailbox.size(false));
                self.phase = Phase::Transaction(mailbox);
                self.writer.line(&response)?;
            }
            Err(Error::BadCredentials) => {
                warn!("{} Rejected login for {:?}", self.log_prefix, user);
                self.writer.line("-ERR invalid password")?;
            }
            Err(e) => {
                error!(
                    "{} Failed to open mailbox of {:?}: {}",
                    self.log_prefix, user, e
                );
                self.writer.line("-ERR unable to open mailbox")?;
            }
        }

        Ok(())
    }

    fn cmd_quit(&mut self) -> Result<(), Error> {
        self.quit = true;

        if let Phase::Transaction(ref mut mailbox) = self.phase {
            match mailbox.commit() {
                Ok(0) => (),
                Ok(n) => info!("{} Removed {} message(s)", self.log_prefix, n),
                Err(e) => {
                    error!(
                        "{} Failed to remove deleted messages: {}",
                        self.log_prefix, e
                    );
                    self.writer.line("-ERR some deleted messages not removed")?;
                    return Ok(());
                }
            }
        }

        self.writer.line("+OK POP3 server signing off")?;
        Ok(())
    }
}

fn cmd_stat(w: &mut ResponseWriter, mailbox: &Mailbox) -> Result<(), Error> {
    w.line(&format!(
        "+OK {} {}",
        mailbox.size(false),
        mailbox.total_size()
    ))?;
    Ok(())
}

fn cmd_list(
    w: &mut ResponseWriter,
    mailbox: &Mailbox,
    args: &[&str],
) -> Result<(), Error> {
    match *args {
        [] => {
            let lines = mailbox
                .live_messages()
                .map(|(ordinal, m)| format!("{} {}", ordinal, m.size()))
                .collect::<Vec<_>>();
            w.multi_line(
                &format!(
                    "+OK {} messages ({} bytes)",
                    mailbox.size(false),
                    mailbox.total_size()
                ),
                lines.iter().map(String::as_str),
            )?;
        }

        [arg] => match find_message(mailbox, arg) {
            Ok((ordinal, size)) => w.line(&format!("+OK {} {}", ordinal, size))?,
            Err(response) => w.line(response)?,
        },

        _ => w.line("-ERR LIST takes at most one argument")?,
    }

    Ok(())
}

fn cmd_dele(
    w: &mut ResponseWriter,
    mailbox: &mut Mailbox,
    args: &[&str],
) -> Result<(), Error> {
    let ordinal = match *args {
        [arg] => parse_ordinal(arg),
        _ => {
            w.line("-ERR please input file number")?;
            return Ok(());
        }
    };

    let message = match ordinal {
        Some(n) => mailbox.message_mut(n),
        None => Err(Error::NxMessage),
    };

    match message {
        Ok(message) => {
            message.tag_for_deletion();
            w.line("+OK message deleted")?;
        }
        Err(_) => w.line("-ERR index is out of bounds")?,
    }

    Ok(())
}

fn cmd_rset(w: &mut ResponseWriter, mailbox: &mut Mailbox) -> Result<(), Error> {
    mailbox.undelete_all();
    w.line(&format!(
        "+OK mailbox has {} messages ({} bytes)",
        mailbox.size(false),
        mailbox.total_size()
    ))?;
    Ok(())
}

fn cmd_retr(
    w: &mut ResponseWriter,
    mailbox: &Mailbox,
    args: &[&str],
    log_prefix: &LogPrefix,
) -> Result<(), Error> {
    let arg = match *args {
        [arg] => arg,
        _ => {
            w.line("-ERR please input file number")?;
            return Ok(());
        }
    };

    let (ordinal, size) = match find_message(mailbox, arg) {
        Ok(found) => found,
        Err(response) => {
            w.line(response)?;
            return Ok(());
        }
    };

    let mut content = match mailbox.message(ordinal).and_then(|m| m.open()) {
        Ok(content) => content,
        Err(Error::NxMessage) => {
            w.line("-ERR message was deleted")?;
            return Ok(());
        }
        Err(e) => {
            error!("{} Failed to open message {}: {}", log_prefix, ordinal, e);
            w.line("-ERR unable to read message")?;
            return Ok(());
        }
    };

    let mut block = w.begin_block(&format!("+OK {} bytes", size))?;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if 0 == content.read_until(b'\n', &mut buf)? {
            break;
        }

        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }

        block.line(&String::from_utf8_lossy(&buf))?;
    }
    block.finish()?;

    Ok(())
}

/// Resolve `arg` to a message which is not tagged for deletion, returning its
/// ordinal and size, or the response to give if there is no such message.
fn find_message(
    mailbox: &Mailbox,
    arg: &str,
) -> Result<(usize, u64), &'static str> {
    let ordinal = parse_ordinal(arg).ok_or("-ERR index is out of bounds")?;
    let message = mailbox
        .message(ordinal)
        .map_err(|_| "-ERR index is out of bounds")?;

    if message.is_deleted() {
        Err("-ERR message was deleted")
    } else {
        Ok((ordinal, message.size()))
    }
}
