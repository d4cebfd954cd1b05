//! Read-only queries against an existing password file.

use crate::line::strip_terminator;
use crate::record::{Record, Target, parse_record};
use crate::validate::MAX_FIELD_LEN;
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Errors that can occur while looking up a record.
#[derive(Debug, Snafu)]
pub enum Error {
    /// Failed to open the password file.
    #[snafu(display("Failed to open passwd file '{}'", path.display()))]
    FileOpen { source: io::Error, path: PathBuf },

    /// Failed to read from the password file.
    #[snafu(display("Failed to read passwd file '{}'", path.display()))]
    FileRead { source: io::Error, path: PathBuf },

    /// A record before the match has an oversized user or realm.
    #[snafu(display(
        "Line {line_number} of '{}' contains a string longer than the allowed maximum size ({limit})",
        path.display()
    ))]
    FieldTooLong {
        path: PathBuf,
        line_number: usize,
        limit: usize,
    },

    /// No record exists for the user and realm.
    #[snafu(display("User '{user}' not found in realm '{realm}'"))]
    UserNotFound { user: String, realm: String },
}

/// Find the first record for `target` in the file at `path`.
///
/// This is the record [`crate::update`] would replace; later duplicates are
/// ignored. Lines are held to the same rules as during an update, so a file
/// that an update would refuse is refused here as well.
pub fn find_record(path: impl AsRef<Path>, target: &Target) -> Result<Option<Record>, Error> {
    let path = path.as_ref();
    let file = File::open(path).context(FileOpenSnafu { path })?;
    let mut reader = BufReader::new(file);
    let mut raw = Vec::new();
    let mut line_number = 0usize;

    loop {
        raw.clear();
        let read = reader
            .read_until(b'\n', &mut raw)
            .context(FileReadSnafu { path })?;
        if read == 0 {
            return Ok(None);
        }
        line_number += 1;
        let content = strip_terminator(&raw);
        if content.starts_with(b"#") {
            continue;
        }
        let Some(fields) = parse_record(content) else {
            continue;
        };
        ensure!(
            fields.user.len() <= MAX_FIELD_LEN && fields.realm.len() <= MAX_FIELD_LEN,
            FieldTooLongSnafu {
                path,
                line_number,
                limit: MAX_FIELD_LEN
            }
        );
        if target.matches(&fields) {
            let text = String::from_utf8_lossy(content);
            return Ok(text.parse().ok());
        }
    }
}

/// Check `secret` against the stored record for `target`.
pub fn verify_user(path: impl AsRef<Path>, target: &Target, secret: &str) -> Result<bool, Error> {
    let record = find_record(path, target)?.context(UserNotFoundSnafu {
        user: target.user(),
        realm: target.realm(),
    })?;
    Ok(record.verify(secret))
}
