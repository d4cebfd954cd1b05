//! Single-pass rewrite of a password file.
//!
//! The engine streams the source line by line and copies everything that is
//! not the target record byte for byte, terminators included. The first
//! record matching the target is replaced in place; if none is found, a new
//! record is appended. Later duplicates of the target are left untouched.

use crate::line::{self, SecretSource, strip_terminator};
use crate::record::{Record, Target, parse_record};
use crate::validate::{self, MAX_FIELD_LEN};
use snafu::{ResultExt, Snafu, ensure};
use std::io::{self, BufRead, Write};

/// Errors that abort a rewrite. Nothing written so far should be kept.
#[derive(Debug, Snafu)]
pub enum Error {
    /// Failed to read the source.
    #[snafu(display("Failed to read line {line_number}"))]
    Read {
        source: io::Error,
        line_number: usize,
    },

    /// Failed to write the output.
    #[snafu(display("Failed to write output"))]
    Write { source: io::Error },

    /// Failed to write a notice.
    #[snafu(display("Failed to write notice"))]
    Notify { source: io::Error },

    /// An existing record has an oversized user or realm.
    #[snafu(display(
        "Line {line_number} contains a string longer than the allowed maximum size ({limit})"
    ))]
    FieldTooLong { line_number: usize, limit: usize },

    /// The password could not be read.
    #[snafu(display("Failed to read password"))]
    Secret { source: line::Error },

    /// The password is not acceptable.
    #[snafu(display("Invalid password"))]
    InvalidSecret { source: validate::Error },
}

/// What a rewrite did with the target record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An existing record was replaced.
    Changed,
    /// A new record was appended.
    Added,
}

/// Copy `input` to `output`, replacing or appending the record for `target`.
///
/// The password is requested from `secret` only once the position of the
/// record is known. Progress messages go to `notices`.
pub fn rewrite<R, W, S>(
    input: &mut R,
    output: &mut W,
    target: &Target,
    secret: &mut S,
    notices: &mut dyn Write,
) -> Result<Outcome, Error>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
    S: SecretSource + ?Sized,
{
    let mut found = false;
    let mut terminated = true;
    let mut line_number = 0usize;
    let mut raw = Vec::new();

    loop {
        raw.clear();
        let read = input
            .read_until(b'\n', &mut raw)
            .context(ReadSnafu {
                line_number: line_number + 1,
            })?;
        if read == 0 {
            break;
        }
        line_number += 1;
        terminated = raw.ends_with(b"\n");

        let content = strip_terminator(&raw);
        let fields = match parse_record(content) {
            Some(fields) if !found && !content.starts_with(b"#") => fields,
            _ => {
                output.write_all(&raw).context(WriteSnafu)?;
                continue;
            }
        };

        ensure!(
            fields.user.len() <= MAX_FIELD_LEN && fields.realm.len() <= MAX_FIELD_LEN,
            FieldTooLongSnafu {
                line_number,
                limit: MAX_FIELD_LEN
            }
        );

        if !target.matches(&fields) {
            output.write_all(&raw).context(WriteSnafu)?;
            continue;
        }

        log::debug!("Found record for the target on line {line_number}");
        writeln!(
            notices,
            "Changing password for {} in realm {}.",
            target.user(),
            target.realm()
        )
        .context(NotifySnafu)?;
        let record = new_record(target, secret)?;
        writeln!(output, "{record}").context(WriteSnafu)?;
        found = true;
    }

    if found {
        return Ok(Outcome::Changed);
    }

    log::debug!("No record for the target in {line_number} lines, appending");
    writeln!(
        notices,
        "Adding password for {} in realm {}.",
        target.user(),
        target.realm()
    )
    .context(NotifySnafu)?;
    let record = new_record(target, secret)?;
    if !terminated {
        output.write_all(b"\n").context(WriteSnafu)?;
    }
    writeln!(output, "{record}").context(WriteSnafu)?;
    Ok(Outcome::Added)
}

fn new_record<S: SecretSource + ?Sized>(target: &Target, secret: &mut S) -> Result<Record, Error> {
    let secret = secret.read_secret().context(SecretSnafu)?;
    Record::new(target, &secret).context(InvalidSecretSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::compute_digest;
    use crate::line::LineSecret;
    use std::io::Cursor;

    struct Run {
        result: Result<Outcome, Error>,
        output: String,
        notices: String,
    }

    fn run(input: &[u8], user: &str, realm: &str, secret: &str) -> Run {
        let target = Target::new(user, realm).unwrap();
        let mut secret = LineSecret::new(Cursor::new(secret.as_bytes().to_vec()));
        let mut output = Vec::new();
        let mut notices = Vec::new();
        let result = rewrite(
            &mut Cursor::new(input),
            &mut output,
            &target,
            &mut secret,
            &mut notices,
        );
        Run {
            result,
            output: String::from_utf8(output).unwrap(),
            notices: String::from_utf8(notices).unwrap(),
        }
    }

    fn record(user: &str, realm: &str, secret: &str) -> String {
        format!("{user}:{realm}:{}", compute_digest(user, realm, secret))
    }

    #[test]
    fn test_add_to_empty_file() {
        let run = run(b"", "alice", "myrealm", "s3cr3t\n");
        assert_eq!(run.result.unwrap(), Outcome::Added);
        assert_eq!(
            run.output,
            "alice:myrealm:b0dc4b58f7bb84cac9807fa0d359658f\n"
        );
        assert_eq!(run.notices, "Adding password for alice in realm myrealm.\n");
    }

    #[test]
    fn test_change_existing_record() {
        let input = format!("{}\n# comment\n", record("alice", "myrealm", "old"));
        let run = run(input.as_bytes(), "alice", "myrealm", "new\n");
        assert_eq!(run.result.unwrap(), Outcome::Changed);
        assert_eq!(
            run.output,
            "alice:myrealm:02ef306d3e9aa58e1e391e704f146ccc\n# comment\n"
        );
        assert_eq!(
            run.notices,
            "Changing password for alice in realm myrealm.\n"
        );
    }

    #[test]
    fn test_unrelated_lines_pass_through() {
        let input = "\
# header
bob:myrealm:0123

alice:other:4567
malformed line
only:two
#alice:myrealm:commented
carol:myrealm:89ab:extra
";
        let run = run(input.as_bytes(), "alice", "myrealm", "pw\n");
        assert_eq!(run.result.unwrap(), Outcome::Added);
        assert_eq!(
            run.output,
            format!("{input}{}\n", record("alice", "myrealm", "pw"))
        );
    }

    #[test]
    fn test_only_first_duplicate_is_replaced() {
        let input = "alice:myrealm:first\nbob:myrealm:x\nalice:myrealm:second\n";
        let run = run(input.as_bytes(), "alice", "myrealm", "pw\n");
        assert_eq!(run.result.unwrap(), Outcome::Changed);
        assert_eq!(
            run.output,
            format!(
                "{}\nbob:myrealm:x\nalice:myrealm:second\n",
                record("alice", "myrealm", "pw")
            )
        );
    }

    #[test]
    fn test_crlf_and_unterminated_lines_are_preserved() {
        let input = "# dos\r\nbob:myrealm:x\r\nlast";
        let run = run(input.as_bytes(), "alice", "myrealm", "pw\r\n");
        assert_eq!(run.result.unwrap(), Outcome::Added);
        assert_eq!(
            run.output,
            format!("{input}\n{}\n", record("alice", "myrealm", "pw"))
        );
    }

    #[test]
    fn test_non_utf8_lines_pass_through() {
        let mut input = b"b\xffb:myrealm:x\n".to_vec();
        input.extend_from_slice(b"alice:myrealm:\xfe\n");
        let target = Target::new("alice", "myrealm").unwrap();
        let mut secret = LineSecret::new(Cursor::new(b"pw\n".to_vec()));
        let mut output = Vec::new();
        let outcome = rewrite(
            &mut Cursor::new(&input),
            &mut output,
            &target,
            &mut secret,
            &mut io::sink(),
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Changed);

        let mut expected = b"b\xffb:myrealm:x\n".to_vec();
        expected.extend_from_slice(record("alice", "myrealm", "pw").as_bytes());
        expected.push(b'\n');
        assert_eq!(output, expected);
    }

    #[test]
    fn test_oversized_field_aborts() {
        let input = format!("{}:myrealm:x\n", "u".repeat(256));
        let run = run(input.as_bytes(), "alice", "myrealm", "pw\n");
        assert!(matches!(
            run.result,
            Err(Error::FieldTooLong {
                line_number: 1,
                limit: 255
            })
        ));
    }

    #[test]
    fn test_oversized_field_reports_line_number() {
        let input = format!("# header\nbob:myrealm:x\n{}:myrealm:x\n", "u".repeat(300));
        let run = run(input.as_bytes(), "alice", "myrealm", "pw\n");
        let err = run.result.unwrap_err();
        assert!(matches!(
            err,
            Error::FieldTooLong {
                line_number: 3,
                limit: 255
            }
        ));
        assert_eq!(
            err.to_string(),
            "Line 3 contains a string longer than the allowed maximum size (255)"
        );
    }

    #[test]
    fn test_oversized_field_after_match_is_copied() {
        let long = format!("{}:myrealm:x\n", "u".repeat(256));
        let input = format!("alice:myrealm:old\n{long}");
        let run = run(input.as_bytes(), "alice", "myrealm", "pw\n");
        assert_eq!(run.result.unwrap(), Outcome::Changed);
        assert!(run.output.ends_with(&long));
    }

    #[test]
    fn test_field_of_max_length_is_accepted() {
        let input = format!("{}:myrealm:x\n", "u".repeat(255));
        let run = run(input.as_bytes(), "alice", "myrealm", "pw\n");
        assert_eq!(run.result.unwrap(), Outcome::Added);
    }

    #[test]
    fn test_missing_secret_aborts() {
        let run = run(b"alice:myrealm:old\n", "alice", "myrealm", "");
        assert!(matches!(
            run.result,
            Err(Error::Secret {
                source: line::Error::Eof
            })
        ));
    }

    #[test]
    fn test_invalid_secret_aborts() {
        let run = run(b"", "alice", "myrealm", "tab\there\n");
        assert!(matches!(run.result, Err(Error::InvalidSecret { .. })));
        assert!(run.output.is_empty());
    }

    #[test]
    fn test_secret_read_only_once() {
        let run = run(
            b"alice:myrealm:old\n",
            "alice",
            "myrealm",
            "first\nsecond\n",
        );
        assert_eq!(run.result.unwrap(), Outcome::Changed);
        assert_eq!(run.output, format!("{}\n", record("alice", "myrealm", "first")));
    }
}
