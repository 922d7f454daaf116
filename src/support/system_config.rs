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

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The system-wide configuration for Duomail.
///
/// This is stored in a file named `duomail.toml` under the data root (by
/// default, the directory the server is started in). The file is optional;
/// every field has a usable default.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Where the users file and mailboxes live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Configuration for the SMTP submission server.
    #[serde(default)]
    pub smtp: SmtpConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// The path to the users file, relative to the data root.
    ///
    /// Each line holds an address and a password, separated by a space.
    pub users_file: PathBuf,

    /// The directory holding one sub-directory per mailbox, relative to the
    /// data root.
    pub mailbox_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            users_file: "users.txt".into(),
            mailbox_dir: "mailbox".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// The host name to report as in the greeting and HELO responses.
    ///
    /// If unset, the system host name is used.
    pub host_name: String,

    /// The name given in the response to QUIT.
    pub service_name: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        SmtpConfig {
            host_name: String::new(),
            service_name: env!("CARGO_PKG_NAME").to_owned(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl SystemConfig {
    /// Load the configuration from `path`.
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        match fs::read(path) {
            Ok(data) => Ok(toml::from_slice(&data)?),
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                Ok(SystemConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = SystemConfig::load(&dir.path().join("duomail.toml"))
            .unwrap();
        assert_eq!(PathBuf::from("users.txt"), config.storage.users_file);
        assert_eq!(PathBuf::from("mailbox"), config.storage.mailbox_dir);
        assert_eq!("", config.smtp.host_name);
        assert_eq!("duomail", config.smtp.service_name);
    }

    #[test]
    fn partial_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("duomail.toml");
        fs::write(&path, "[smtp]\nhost_name = \"mx.example.com\"\n").unwrap();

        let config = SystemConfig::load(&path).unwrap();
        assert_eq!("mx.example.com", config.smtp.host_name);
        assert_eq!("duomail", config.smtp.service_name);
        assert_eq!(PathBuf::from("users.txt"), config.storage.users_file);
    }

    #[test]
    fn malformed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("duomail.toml");
        fs::write(&path, "[smtp\n").unwrap();

        assert_matches!(Err(LoadError::Toml(_)), SystemConfig::load(&path));
    }
}
