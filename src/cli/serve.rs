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

use std::io;
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};

use super::main::ServeOptions;
use crate::account::directory::Directory;
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::SystemConfig;

// Need to use a this and not die! so that errors go to syslog/etc
macro_rules! fatal {
    ($ex:ident, $($stuff:tt)*) => {{
        error!($($stuff)*);
        crate::support::sysexits::$ex.exit()
    }}
}

pub(super) fn pop3(
    system_config: SystemConfig,
    root: &Path,
    options: &ServeOptions,
) {
    let directory = load_directory(&system_config, root);
    let mailbox_root = root.join(&system_config.storage.mailbox_dir);
    let listener = bind("pop3", options);

    accept_loop(&listener, move |stream, peer_name| {
        let write = stream.try_clone()?;
        crate::pop3::server::Server::new(
            Box::new(io::BufReader::new(stream)),
            Box::new(write),
            Arc::clone(&directory),
            mailbox_root.clone(),
            LogPrefix::new("pop3", peer_name),
        )
        .run()
    });
}

pub(super) fn smtp(
    system_config: SystemConfig,
    root: &Path,
    options: &ServeOptions,
) {
    let directory = load_directory(&system_config, root);
    let mailbox_root = root.join(&system_config.storage.mailbox_dir);
    let host_name = host_name(&system_config);
    let system_config = Arc::new(system_config);
    let listener = bind("smtp", options);

    accept_loop(&listener, move |stream, peer_name| {
        let write = stream.try_clone()?;
        crate::smtp::server::Server::new(
            Box::new(io::BufReader::new(stream)),
            Box::new(write),
            Arc::clone(&system_config),
            Arc::clone(&directory),
            mailbox_root.clone(),
            host_name.clone(),
            LogPrefix::new("smtp", peer_name),
        )
        .run()
    });
}

fn load_directory(system_config: &SystemConfig, root: &Path) -> Arc<Directory> {
    let users_file = root.join(&system_config.storage.users_file);
    match Directory::load(&users_file) {
        Ok(directory) => {
            info!(
                "Loaded {} address(es) from '{}'",
                directory.len(),
                users_file.display()
            );
            Arc::new(directory)
        }
        Err(e) => fatal!(
            EX_CONFIG,
            "Unable to read users file '{}': {}",
            users_file.display(),
            e
        ),
    }
}

fn bind(protocol: &str, options: &ServeOptions) -> TcpListener {
    match TcpListener::bind((options.address.as_str(), options.port)) {
        Ok(listener) => {
            info!(
                "{} waiting for connections on {}:{}",
                protocol, options.address, options.port
            );
            listener
        }
        Err(e) => fatal!(
            EX_OSERR,
            "Unable to listen on {}:{}: {}",
            options.address,
            options.port,
            e
        ),
    }
}

fn host_name(system_config: &SystemConfig) -> String {
    if !system_config.smtp.host_name.is_empty() {
        return system_config.smtp.host_name.clone();
    }

    let mut buf = [0u8; 256];
    let host_name_cstr =
        nix::unistd::gethostname(&mut buf).unwrap_or_else(|e| {
            fatal!(
                EX_OSERR,
                "Failed to determine host name; you may \
                 need to explicitly configure it: {}",
                e
            )
        });
    host_name_cstr
        .to_str()
        .unwrap_or_else(|_| fatal!(EX_OSERR, "System host name is not UTF-8"))
        .to_owned()
}

/// Accept connections forever, running `session` for each one on its own
/// thread.
fn accept_loop<F>(listener: &TcpListener, session: F)
where
    F: Fn(TcpStream, String) -> Result<(), Error> + Send + Sync + 'static,
{
    let session = Arc::new(session);

    loop {
        let (stream, origin) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let peer_name = origin.to_string();
        info!("{} Connection established", peer_name);

        let session = Arc::clone(&session);
        std::thread::spawn(move || match session(stream, peer_name.clone()) {
            Ok(()) => info!("{} Normal client disconnect", peer_name),
            Err(e) => warn!("{} Abnormal client disconnect: {}", peer_name, e),
        });
    }
}
