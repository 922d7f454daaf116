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

use log::warn;

use super::directory::Directory;
use crate::support::error::Error;
use crate::support::file_ops::IgnoreKinds;

/// A snapshot of one user's mailbox, opened for a retrieval session.
///
/// Messages are addressed by 1-based ordinals which stay fixed for the life
/// of the `Mailbox`, even while some messages are tagged for deletion. Tags
/// only take effect on disk when `commit()` is called.
#[derive(Debug)]
pub struct Mailbox {
    user: String,
    messages: Vec<Message>,
}

#[derive(Debug)]
pub struct Message {
    path: PathBuf,
    size: u64,
    deleted: bool,
}

impl Message {
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn tag_for_deletion(&mut self) {
        self.deleted = true;
    }

    pub fn undelete(&mut self) {
        self.deleted = false;
    }

    /// Open the message content for reading.
    ///
    /// Fails with `Error::NxMessage` if the file has gone away since the
    /// mailbox was opened.
    pub fn open(&self) -> Result<io::BufReader<fs::File>, Error> {
        match fs::File::open(&self.path) {
            Ok(f) => Ok(io::BufReader::new(f)),
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                Err(Error::NxMessage)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Mailbox {
    /// Authenticate `user` with `password` and open their mailbox.
    ///
    /// An unknown user and a wrong password both fail with
    /// `Error::BadCredentials`.
    pub fn open(
        directory: &Directory,
        mailbox_root: &Path,
        user: &str,
        password: &str,
    ) -> Result<Self, Error> {
        let entry = directory
            .lookup(user)
            .filter(|e| e.check_password(password))
            .ok_or(Error::BadCredentials)?;

        Self::load(entry.address.clone(), &mailbox_root.join(&entry.address))
    }

    fn load(user: String, path: &Path) -> Result<Self, Error> {
        let mut names = Vec::new();
        match fs::read_dir(path) {
            Ok(rd) => {
                for dirent in rd {
                    let dirent = dirent?;
                    let name = dirent.file_name();
                    // Dotfiles are deliveries still being staged
                    if name.to_string_lossy().starts_with('.') {
                        continue;
                    }
                    names.push(name);
                }
            }
            // Nothing has been delivered yet
            Err(e) if io::ErrorKind::NotFound == e.kind() => (),
            Err(e) => return Err(e.into()),
        }

        names.sort();

        let mut messages = Vec::with_capacity(names.len());
        for name in names {
            let path = path.join(name);
            let md = match fs::metadata(&path) {
                Ok(md) => md,
                // Purged by another session between listing and now
                Err(e) if io::ErrorKind::NotFound == e.kind() => continue,
                Err(e) => return Err(e.into()),
            };

            if !md.is_file() {
                warn!("Ignoring non-file {} in mailbox", path.display());
                continue;
            }

            messages.push(Message {
                path,
                size: md.len(),
                deleted: false,
            });
        }

        Ok(Mailbox { user, messages })
    }

    /// The canonical name of the mailbox owner.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The number of messages, optionally counting those tagged for
    /// deletion.
    pub fn size(&self, include_deleted: bool) -> usize {
        if include_deleted {
            self.messages.len()
        } else {
            self.messages.iter().filter(|m| !m.deleted).count()
        }
    }

    /// The total size in bytes of all messages not tagged for deletion.
    pub fn total_size(&self) -> u64 {
        self.messages
            .iter()
            .filter(|m| !m.deleted)
            .map(|m| m.size)
            .sum()
    }

    pub fn message(&self, ordinal: usize) -> Result<&Message, Error> {
        ordinal
            .checked_sub(1)
            .and_then(|ix| self.messages.get(ix))
            .ok_or(Error::NxMessage)
    }

    pub fn message_mut(
        &mut self,
        ordinal: usize,
    ) -> Result<&mut Message, Error> {
        let ix = ordinal.checked_sub(1).ok_or(Error::NxMessage)?;
        self.messages.get_mut(ix).ok_or(Error::NxMessage)
    }

    /// Iterate over the messages not tagged for deletion, with their
    /// ordinals.
    pub fn live_messages(&self) -> impl Iterator<Item = (usize, &Message)> {
        self.messages
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.deleted)
            .map(|(ix, m)| (ix + 1, m))
    }

    /// Remove the deletion tag from every message.
    pub fn undelete_all(&mut self) {
        for message in &mut self.messages {
            message.undelete();
        }
    }

    /// Permanently remove every message tagged for deletion.
    ///
    /// Returns the number of messages removed. Messages someone else already
    /// removed count as removed.
    pub fn commit(&mut self) -> Result<usize, Error> {
        let mut removed = 0;
        for message in self.messages.iter().filter(|m| m.deleted) {
            fs::remove_file(&message.path).ignore_not_found()?;
            removed += 1;
        }

        self.messages.retain(|m| !m.deleted);
        Ok(removed)
    }
}

#[cfg(test)]
mod test {
    use std::io::Read;

    use tempfile::TempDir;

    use super::*;

    fn set_up() -> (TempDir, Directory) {
        crate::init_test_log();

        let root = TempDir::new().unwrap();
        let alice = root.path().join("alice@example.com");
        fs::create_dir(&alice).unwrap();
        fs::write(alice.join("1.txt"), "first\r\n").unwrap();
        fs::write(alice.join("2.txt"), "second message\r\n").unwrap();
        fs::write(alice.join("3.txt"), "third\r\n").unwrap();
        fs::write(alice.join(".tmp123"), "staged").unwrap();

        let directory = Directory::parse(
            "alice@example.com secret\nbob@example.com hunter2\n",
        );
        (root, directory)
    }

    #[test]
    fn authentication() {
        let (root, directory) = set_up();

        assert_matches!(
            Err(Error::BadCredentials),
            Mailbox::open(&directory, root.path(), "alice@example.com", "nope")
        );
        assert_matches!(
            Err(Error::BadCredentials),
            Mailbox::open(&directory, root.path(), "zim@example.com", "secret")
        );

        let mailbox =
            Mailbox::open(&directory, root.path(), "ALICE@example.com", "secret")
                .unwrap();
        assert_eq!("alice@example.com", mailbox.user());
    }

    #[test]
    fn empty_mailbox() {
        let (root, directory) = set_up();
        let mailbox =
            Mailbox::open(&directory, root.path(), "bob@example.com", "hunter2")
                .unwrap();
        assert_eq!(0, mailbox.size(true));
        assert_eq!(0, mailbox.total_size());
        assert_matches!(Err(Error::NxMessage), mailbox.message(1));
    }

    #[test]
    fn listing_and_tagging() {
        let (root, directory) = set_up();
        let mut mailbox =
            Mailbox::open(&directory, root.path(), "alice@example.com", "secret")
                .unwrap();

        assert_eq!(3, mailbox.size(false));
        assert_eq!(3, mailbox.size(true));
        assert_eq!(7 + 16 + 7, mailbox.total_size());
        assert_matches!(Err(Error::NxMessage), mailbox.message(0));
        assert_matches!(Err(Error::NxMessage), mailbox.message(4));
        assert_eq!(16, mailbox.message(2).unwrap().size());

        mailbox.message_mut(2).unwrap().tag_for_deletion();
        assert_eq!(2, mailbox.size(false));
        assert_eq!(3, mailbox.size(true));
        assert_eq!(14, mailbox.total_size());
        assert!(mailbox.message(2).unwrap().is_deleted());
        assert_eq!(
            vec![1, 3],
            mailbox.live_messages().map(|(n, _)| n).collect::<Vec<_>>()
        );

        mailbox.undelete_all();
        assert_eq!(3, mailbox.size(false));
        assert_eq!(30, mailbox.total_size());
    }

    #[test]
    fn reading_content() {
        let (root, directory) = set_up();
        let mailbox =
            Mailbox::open(&directory, root.path(), "alice@example.com", "secret")
                .unwrap();

        let mut content = String::new();
        mailbox
            .message(2)
            .unwrap()
            .open()
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!("second message\r\n", content);

        fs::remove_file(root.path().join("alice@example.com/3.txt")).unwrap();
        assert_matches!(Err(Error::NxMessage), mailbox.message(3).unwrap().open());
    }

    #[test]
    fn commit_purges_tagged() {
        let (root, directory) = set_up();
        let alice = root.path().join("alice@example.com");
        let mut mailbox =
            Mailbox::open(&directory, root.path(), "alice@example.com", "secret")
                .unwrap();

        mailbox.message_mut(1).unwrap().tag_for_deletion();
        mailbox.message_mut(3).unwrap().tag_for_deletion();
        // Already gone; still counts
        fs::remove_file(alice.join("3.txt")).unwrap();

        assert_eq!(2, mailbox.commit().unwrap());
        assert!(!alice.join("1.txt").exists());
        assert!(alice.join("2.txt").exists());
        assert_eq!(1, mailbox.size(true));

        let reopened =
            Mailbox::open(&directory, root.path(), "alice@example.com", "secret")
                .unwrap();
        assert_eq!(1, reopened.size(true));
        assert_eq!(16, reopened.total_size());
    }
}
