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
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::error;
use tempfile::NamedTempFile;

use super::directory::Directory;
use crate::support::error::Error;
use crate::support::file_ops::{ensure_dir, new_message_path, IgnoreKinds};

/// A mailbox which can receive a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryTarget {
    address: String,
    path: PathBuf,
}

impl DeliveryTarget {
    /// Resolve `address` to the mailbox it names.
    ///
    /// Fails with `Error::NxUser` if the address is not in the directory.
    pub fn resolve(
        directory: &Directory,
        mailbox_root: &Path,
        address: &str,
    ) -> Result<Self, Error> {
        let entry = directory.lookup(address).ok_or(Error::NxUser)?;
        Ok(DeliveryTarget {
            address: entry.address.clone(),
            path: mailbox_root.join(&entry.address),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

/// A message being delivered to one or more mailboxes.
///
/// The content is staged in a hidden temporary file inside each destination
/// mailbox. Nothing becomes visible to readers until `commit()`; dropping an
/// uncommitted `Delivery` removes all the staged files.
pub struct Delivery {
    staged: Vec<(PathBuf, io::BufWriter<NamedTempFile>)>,
}

impl Delivery {
    pub fn begin(targets: &[DeliveryTarget]) -> Result<Self, Error> {
        let mut staged = Vec::with_capacity(targets.len());
        for target in targets {
            ensure_dir(&target.path)?;
            let tf = tempfile::Builder::new()
                .prefix(".delivery")
                .tempfile_in(&target.path)?;
            staged.push((target.path.clone(), io::BufWriter::new(tf)));
        }

        Ok(Delivery { staged })
    }

    /// Append one line of content, adding a DOS line ending.
    pub fn write_line(&mut self, line: &str) -> Result<(), Error> {
        for (_, w) in &mut self.staged {
            w.write_all(line.as_bytes())?;
            w.write_all(b"\r\n")?;
        }
        Ok(())
    }

    /// Make the message durable and visible in every destination.
    ///
    /// All copies are written out and synced before any of them is moved
    /// into place. If any copy fails to move into place, the copies already
    /// moved are removed again, so an error means nothing was delivered.
    pub fn commit(self) -> Result<(), Error> {
        let mut ready = Vec::with_capacity(self.staged.len());
        for (dir, w) in self.staged {
            let tf = w.into_inner().map_err(io::Error::from)?;
            tf.as_file().sync_all()?;
            ready.push((dir, tf));
        }

        let mut delivered: Vec<PathBuf> = Vec::with_capacity(ready.len());
        for (dir, tf) in ready {
            let path = new_message_path(&dir);
            if let Err(e) = tf.persist_noclobber(&path) {
                for path in delivered {
                    if let Err(err) = fs::remove_file(&path).ignore_not_found()
                    {
                        error!(
                            "Failed to retract partial delivery {}: {}",
                            path.display(),
                            err
                        );
                    }
                }
                return Err(e.error.into());
            }
            delivered.push(path);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    fn set_up() -> (TempDir, Directory) {
        crate::init_test_log();
        (
            TempDir::new().unwrap(),
            Directory::parse("Alice@example.com pw\nbob@example.com pw\n"),
        )
    }

    fn contents(dir: &Path) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .unwrap()
            .map(|d| d.unwrap().path())
            .collect::<Vec<_>>();
        names.sort();
        names
            .into_iter()
            .map(|p| fs::read_to_string(p).unwrap())
            .collect()
    }

    #[test]
    fn resolution() {
        let (root, directory) = set_up();
        let target =
            DeliveryTarget::resolve(&directory, root.path(), "alice@EXAMPLE.com")
                .unwrap();
        assert_eq!("Alice@example.com", target.address());

        assert_matches!(
            Err(Error::NxUser),
            DeliveryTarget::resolve(&directory, root.path(), "zim@example.com")
        );
    }

    #[test]
    fn deliver_to_several() {
        let (root, directory) = set_up();
        let targets = vec![
            DeliveryTarget::resolve(&directory, root.path(), "alice@example.com")
                .unwrap(),
            DeliveryTarget::resolve(&directory, root.path(), "bob@example.com")
                .unwrap(),
        ];

        let mut delivery = Delivery::begin(&targets).unwrap();
        delivery.write_line("Subject: hello").unwrap();
        delivery.write_line("").unwrap();
        delivery.write_line("Hi.").unwrap();
        delivery.commit().unwrap();

        let expected = "Subject: hello\r\n\r\nHi.\r\n".to_owned();
        assert_eq!(
            vec![expected.clone()],
            contents(&root.path().join("Alice@example.com"))
        );
        assert_eq!(
            vec![expected],
            contents(&root.path().join("bob@example.com"))
        );
    }

    #[test]
    fn abandoned_delivery_leaves_nothing() {
        let (root, directory) = set_up();
        let targets = vec![DeliveryTarget::resolve(
            &directory,
            root.path(),
            "bob@example.com",
        )
        .unwrap()];

        let mut delivery = Delivery::begin(&targets).unwrap();
        delivery.write_line("partial").unwrap();
        drop(delivery);

        assert!(contents(&root.path().join("bob@example.com")).is_empty());
    }

    #[test]
    fn successive_deliveries_keep_order() {
        let (root, directory) = set_up();
        let targets = vec![DeliveryTarget::resolve(
            &directory,
            root.path(),
            "bob@example.com",
        )
        .unwrap()];

        for body in &["one", "two", "three"] {
            let mut delivery = Delivery::begin(&targets).unwrap();
            delivery.write_line(body).unwrap();
            delivery.commit().unwrap();
        }

        assert_eq!(
            vec!["one\r\n", "two\r\n", "three\r\n"],
            contents(&root.path().join("bob@example.com"))
        );
    }

    #[test]
    fn failed_commit_delivers_nothing() {
        let (root, directory) = set_up();
        let targets = vec![
            DeliveryTarget::resolve(&directory, root.path(), "alice@example.com")
                .unwrap(),
            DeliveryTarget::resolve(&directory, root.path(), "bob@example.com")
                .unwrap(),
        ];

        let mut delivery = Delivery::begin(&targets).unwrap();
        delivery.write_line("Subject: hello").unwrap();

        // Pull the second copy out from under the delivery so that moving it
        // into place fails after the first one has already landed.
        let staged = delivery.staged[1].1.get_ref().path().to_owned();
        fs::remove_file(&staged).unwrap();

        assert_matches!(Err(Error::Io(_)), delivery.commit());
        assert!(contents(&root.path().join("Alice@example.com")).is_empty());
        assert!(contents(&root.path().join("bob@example.com")).is_empty());
    }
}
