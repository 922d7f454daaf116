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

use super::syntax::{parse_mail_from, parse_rcpt_to, Verb};
use crate::account::delivery::{Delivery, DeliveryTarget};
use crate::account::directory::Directory;
use crate::support::error::Error;
use crate::support::line_reader::LineReader;
use crate::support::log_prefix::LogPrefix;
use crate::support::response_writer::ResponseWriter;
use crate::support::system_config::SystemConfig;
use crate::support::tokenise::{tokenise, Tokens};

/// The mail transaction in progress, opened by MAIL.
#[derive(Debug)]
struct Envelope {
    sender: String,
    recipients: Vec<DeliveryTarget>,
}

/// A single SMTP session.
pub struct Server {
    reader: LineReader,
    writer: ResponseWriter,
    config: Arc<SystemConfig>,
    directory: Arc<Directory>,
    mailbox_root: PathBuf,
    host_name: String,
    log_prefix: LogPrefix,

    remote_domain: Option<String>,
    envelope: Option<Envelope>,
    quit: bool,
}

impl Server {
    pub fn new(
        read: Box<dyn BufRead>,
        write: Box<dyn Write>,
        config: Arc<SystemConfig>,
        directory: Arc<Directory>,
        mailbox_root: PathBuf,
        host_name: String,
        log_prefix: LogPrefix,
    ) -> Self {
        Server {
            reader: LineReader::new(read),
            writer: ResponseWriter::new(write),
            config,
            directory,
            mailbox_root,
            host_name,
            log_prefix,
            remote_domain: None,
            envelope: None,
            quit: false,
        }
    }

    /// Run the session.
    ///
    /// Blocks until the client quits or disconnects, both of which return
    /// `Ok`. An `Err` means the connection itself failed.
    pub fn run(&mut self) -> Result<(), Error> {
        self.writer.line(&format!(
            "220 {} Simple Mail Transfer Service Ready",
            self.host_name
        ))?;

        while !self.quit {
            let line = match self.reader.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("{} EOF without QUIT", self.log_prefix);
                    return Ok(());
                }
                Err(Error::LineTooLong) => {
                    self.writer.line("500 Line too long")?;
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
                self.writer.line("500 Syntax error, command unrecognised")?;
                return Ok(());
            }
        };
        let args = &tokens.args[..];
        debug!("{} Command {:?}", self.log_prefix, verb);

        match verb {
            Verb::Hello => self.cmd_hello(args),
            Verb::Verify => self.cmd_verify(args),
            Verb::Mail => self.cmd_mail(args),
            Verb::Recipient => self.cmd_recipient(args),
            Verb::Data => self.cmd_data(),
            Verb::Reset => {
                self.envelope = None;
                self.writer.line("250 OK")?;
                Ok(())
            }
            Verb::Noop => {
                self.writer.line("250 OK")?;
                Ok(())
            }
            Verb::Quit => {
                self.quit = true;
                self.writer.line(&format!(
                    "221 {} Service closing transmission channel",
                    self.config.smtp.service_name
                ))?;
                Ok(())
            }
        }
    }

    fn cmd_hello(&mut self, args: &[&str]) -> Result<(), Error> {
        let domain = match *args {
            [domain] => domain,
            _ => {
                self.writer.line("501 Incorrect command format")?;
                return Ok(());
            }
        };

        self.log_prefix.set_helo(domain.to_owned());
        self.remote_domain = Some(domain.to_owned());
        self.writer
            .line(&format!("250 {} greets {}", self.host_name, domain))?;
        Ok(())
    }

    fn cmd_verify(&mut self, args: &[&str]) -> Result<(), Error> {
        match *args {
            [address] if self.directory.contains(address) => {
                self.writer.line(&format!("250 {}", address))?
            }
            [_] => self.writer.line("550 Username does not exist")?,
            _ => self.writer.line("501 Incorrect command format")?,
        }

        Ok(())
    }

    fn cmd_mail(&mut self, args: &[&str]) -> Result<(), Error> {
        let sender = match *args {
            [arg] => parse_mail_from(arg),
            _ => None,
        };
        let sender = match sender {
            Some(sender) => sender,
            None => {
                self.writer.line("501 Incorrect command format")?;
                return Ok(());
            }
        };

        if self.remote_domain.is_none() {
            self.writer.line("503 EHLO command not received")?;
            return Ok(());
        }

        self.envelope = Some(Envelope {
            sender: sender.to_owned(),
            recipients: Vec::new(),
        });
        self.writer.line("250 OK")?;
        Ok(())
    }

    fn cmd_recipient(&mut self, args: &[&str]) -> Result<(), Error> {
        let address = match *args {
            [arg] => parse_rcpt_to(arg),
            _ => None,
        };
        let address = match address {
            Some(address) => address,
            None => {
                self.writer.line("501 Incorrect command format")?;
                return Ok(());
            }
        };

        let envelope = match self.envelope {
            Some(ref mut envelope) => envelope,
            None => {
                self.writer.line("503 MAIL command not received")?;
                return Ok(());
            }
        };

        match DeliveryTarget::resolve(
            &self.directory,
            &self.mailbox_root,
            address,
        ) {
            Ok(target) => {
                envelope.recipients.push(target);
                self.writer.line("250 OK")?;
            }
            Err(e) => {
                debug!(
                    "{} Rejected recipient {:?}: {}",
                    self.log_prefix, address, e
                );
                self.writer.line("550 mailbox not found")?;
            }
        }

        Ok(())
    }

    fn cmd_data(&mut self) -> Result<(), Error> {
        let envelope = match self.envelope.take() {
            Some(envelope) if !envelope.recipients.is_empty() => envelope,
            other => {
                self.envelope = other;
                self.writer.line("503 bad sequence of commands")?;
                return Ok(());
            }
        };

        let mut delivery = match Delivery::begin(&envelope.recipients) {
            Ok(delivery) => delivery,
            Err(e) => {
                error!("{} Failed to start delivery: {}", self.log_prefix, e);
                self.envelope = Some(envelope);
                self.writer.line(
                    "451 Requested action aborted: local error in processing",
                )?;
                return Ok(());
            }
        };

        self.writer.line(
            "354 enter the message body, followed by a <CRLF>.<CRLF>",
        )?;

        // Once something goes wrong, keep reading up to the terminator so
        // the client stays in sync, but stop writing.
        let mut failure: Option<&'static str> = None;
        loop {
            let line = match self.reader.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!(
                        "{} EOF during DATA; message discarded",
                        self.log_prefix
                    );
                    self.quit = true;
                    return Ok(());
                }
                Err(Error::LineTooLong) => {
                    failure = Some("500 Line too long");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if "." == line {
                break;
            }

            if failure.is_some() {
                continue;
            }

            let content = line.strip_prefix('.').unwrap_or(&line[..]);
            if let Err(e) = delivery.write_line(content) {
                error!("{} Failed to write message: {}", self.log_prefix, e);
                failure = Some(
                    "451 Requested action aborted: local error in processing",
                );
            }
        }

        if let Some(response) = failure {
            warn!("{} Message discarded: {}", self.log_prefix, response);
            self.writer.line(response)?;
            return Ok(());
        }

        match delivery.commit() {
            Ok(()) => {
                info!(
                    "{} Delivered message from <{}> to {}",
                    self.log_prefix,
                    envelope.sender,
                    envelope
                        .recipients
                        .iter()
                        .map(DeliveryTarget::address)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                self.writer.line("250 OK")?;
            }
            Err(e) => {
                error!("{} Failed to commit message: {}", self.log_prefix, e);
                self.writer.line(
                    "451 Requested action aborted: local error in processing",
                )?;
            }
        }

        Ok(())
    }
}
