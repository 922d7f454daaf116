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

//! Miscellaneous functions for working with files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::prelude::*;
use rand::{rngs::OsRng, Rng};

/// The last timestamp, in microseconds since the epoch, handed out by
/// `new_message_path`.
static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// Choose a name for a new message file in `dir`.
///
/// Names start with a UTC timestamp so that the lexical order of a mailbox
/// directory is its arrival order. Timestamps handed out by this process
/// strictly increase, even if the clock steps backwards or two deliveries
/// land in the same microsecond. The random suffix keeps deliveries from
/// separate processes from colliding.
pub fn new_message_path(dir: &Path) -> PathBuf {
    dir.join(format!(
        "{}-{:016x}.txt",
        next_stamp().format("%Y%m%dT%H%M%S%.6fZ"),
        OsRng.gen::<u64>()
    ))
}

fn next_stamp() -> DateTime<Utc> {
    let now = Utc::now();
    let now_micros =
        now.timestamp() * 1_000_000 + i64::from(now.timestamp_subsec_micros());
    let prev = LAST_STAMP
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now_micros.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    let stamp = now_micros.max(prev + 1);

    Utc.timestamp_opt(
        stamp.div_euclid(1_000_000),
        (stamp.rem_euclid(1_000_000) * 1000) as u32,
    )
    .single()
    .unwrap_or(now)
}

/// Create `dir` and its parents if they do not already exist.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir).ignore_already_exists()
}

pub trait IgnoreKinds {
    fn ignore_already_exists(self) -> Self;
    fn ignore_not_found(self) -> Self;
}

impl<R: Default> IgnoreKinds for Result<R, io::Error> {
    fn ignore_already_exists(self) -> Self {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::AlreadyExists == e.kind() => {
                Ok(R::default())
            }
            Err(e) => Err(e),
        }
    }

    fn ignore_not_found(self) -> Self {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::NotFound == e.kind() => Ok(R::default()),
            Err(e) => Err(e),
        }
    }
}
