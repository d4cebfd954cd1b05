use crate::digest::{compute_digest, verify_digest};
use crate::validate::{self, check_field, check_printable_ascii, check_user};
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when turning a line into a [`Record`].
#[derive(Debug, Snafu)]
pub enum Error {
    /// The line has fewer than three `:`-separated fields.
    #[snafu(display("Line '{line}' is not a user:realm:digest record"))]
    NotARecord { line: String },

    /// The line is a comment.
    #[snafu(display("Line '{line}' is a comment"))]
    Comment { line: String },

    /// A field of the record is not acceptable.
    #[snafu(display("Invalid record field"))]
    Field { source: validate::Error },
}

/// A borrowed view of a line with at least three `:`-separated fields.
///
/// `rest` is everything after the second separator: the digest, plus any
/// extra fields, untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFields<'a> {
    /// First field.
    pub user: &'a [u8],
    /// Second field.
    pub realm: &'a [u8],
    /// Third field and anything following it.
    pub rest: &'a [u8],
}

/// Split a line (without its terminator) into record fields.
///
/// Returns `None` when the line has fewer than three fields. Comments are not
/// recognised here; callers skip `#` lines first.
pub fn parse_record(line: &[u8]) -> Option<RecordFields<'_>> {
    let mut fields = line.splitn(3, |&b| b == b':');
    Some(RecordFields {
        user: fields.next()?,
        realm: fields.next()?,
        rest: fields.next()?,
    })
}

/// Render a `user:realm:digest` record for a validated target and password.
pub fn format_record(target: &Target, secret: &str) -> Result<String, validate::Error> {
    Record::new(target, secret).map(|record| record.to_string())
}

/// The `(user, realm)` pair an operation is aimed at.
///
/// Construction validates both fields, so everything downstream can assume
/// printable ASCII without separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    user: String,
    realm: String,
}

impl Target {
    /// Validate and build a target.
    pub fn new(user: impl Into<String>, realm: impl Into<String>) -> Result<Self, validate::Error> {
        let user = user.into();
        let realm = realm.into();
        check_user(&user)?;
        check_field("realm", &realm)?;
        Ok(Self { user, realm })
    }

    /// The username.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The realm.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Whether a parsed line belongs to this user and realm.
    pub fn matches(&self, fields: &RecordFields<'_>) -> bool {
        fields.user == self.user.as_bytes() && fields.realm == self.realm.as_bytes()
    }
}

/// A single `user:realm:digest` entry of a password file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    user: String,
    realm: String,
    digest: String,
}

impl Record {
    /// Hash `secret` into a fresh record for `target`.
    pub fn new(target: &Target, secret: &str) -> Result<Self, validate::Error> {
        check_printable_ascii("password", secret)?;
        Ok(Self {
            user: target.user.clone(),
            realm: target.realm.clone(),
            digest: compute_digest(&target.user, &target.realm, secret),
        })
    }

    /// The username.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The realm.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// The stored digest, including any trailing fields the line carried.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Check a password against this record.
    pub fn verify(&self, secret: &str) -> bool {
        let digest = self.digest.split(':').next().unwrap_or_default();
        verify_digest(&self.user, &self.realm, secret, digest)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.user, self.realm, self.digest)
    }
}

impl FromStr for Record {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Error> {
        ensure!(!line.starts_with('#'), CommentSnafu { line });
        let fields = parse_record(line.as_bytes()).context(NotARecordSnafu { line })?;
        // Splitting a str on an ASCII byte keeps every piece valid UTF-8.
        let text = |bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned();
        let (user, realm) = (text(fields.user), text(fields.realm));
        validate::check_field_length("user", &user).context(FieldSnafu)?;
        validate::check_field_length("realm", &realm).context(FieldSnafu)?;
        Ok(Self {
            user,
            realm,
            digest: text(fields.rest),
        })
    }
}
