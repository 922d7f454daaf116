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

use std::path::{Path, PathBuf};

use structopt::StructOpt;

use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Run the POP3 retrieval server.
    ///
    /// Clients log in with an address and password from the users file and
    /// can list, read, and delete the messages in their mailbox. Deletions
    /// take effect when the client sends QUIT.
    ServePop3(ServeOptions),
    /// Run the SMTP submission server.
    ///
    /// Messages are accepted for any address in the users file and written
    /// into that address's mailbox.
    ServeSmtp(ServeOptions),
}

#[derive(StructOpt)]
pub(super) struct ServeOptions {
    /// The directory containing `duomail.toml`, the users file, and the
    /// mailboxes [default: the current directory]
    #[structopt(long, parse(from_os_str))]
    pub(super) root: Option<PathBuf>,

    /// The address to listen on
    #[structopt(long, default_value = "0.0.0.0")]
    pub(super) address: String,

    /// The TCP port to listen on
    pub(super) port: u16,
}

impl Command {
    fn options(&self) -> &ServeOptions {
        match *self {
            Command::ServePop3(ref o) | Command::ServeSmtp(ref o) => o,
        }
    }
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    let options = cmd.options();
    let root = options.root.clone().unwrap_or_else(|| ".".into());
    let root = match root.canonicalize() {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Unable to canonicalise '{}': {}", root.display(), e);
            EX_IOERR.exit()
        }
    };

    let system_config_path = root.join("duomail.toml");
    let system_config = match SystemConfig::load(&system_config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Error in config file at '{}': {}",
                system_config_path.display(),
                e
            );
            EX_CONFIG.exit()
        }
    };

    init_logging(&root);

    match cmd {
        Command::ServePop3(ref options) => {
            super::serve::pop3(system_config, &root, options)
        }
        Command::ServeSmtp(ref options) => {
            super::serve::smtp(system_config, &root, options)
        }
    }
}

fn init_logging(root: &Path) {
    if Ok(true) == nix::unistd::isatty(2) {
        // Running interactively; ignore logging configuration and just write
        // to stderr.
        crate::init_simple_log();
        return;
    }

    let log_config_file = root.join("logging.toml");
    if log_config_file.is_file() {
        if let Err(e) = log4rs::init_file(
            &log_config_file,
            log4rs::file::Deserializers::new(),
        ) {
            eprintln!(
                "Failed to initialise logging from '{}': {}",
                log_config_file.display(),
                e
            );
            EX_CONFIG.exit();
        }
    } else {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_MAIL,
            hostname: None,
            process: env!("CARGO_PKG_NAME").to_owned(),
            pid: nix::unistd::getpid().as_raw(),
        };

        let logger = match syslog::unix(formatter) {
            Ok(logger) => logger,
            Err(e) => {
                eprintln!("Failed to connect to syslog: {}", e);
                EX_OSERR.exit()
            }
        };

        if let Err(e) =
            log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
                .map(|_| log::set_max_level(log::LevelFilter::Info))
        {
            eprintln!("Failed to initialise logging: {}", e);
            EX_OSERR.exit();
        }
    }
}
