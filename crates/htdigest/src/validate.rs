use snafu::{Snafu, ensure};

/// Maximum size of a user or realm field, terminator included.
pub const MAX_STRING_LEN: usize = 256;

/// Longest user or realm accepted, in bytes.
pub const MAX_FIELD_LEN: usize = MAX_STRING_LEN - 1;

/// Longest password line accepted, in bytes.
pub const MAX_LINE_LEN: usize = 768;

/// Errors raised when a user, realm or password is not acceptable.
#[derive(Debug, Snafu)]
pub enum Error {
    /// The text contains a character outside 0x20..=0x7E.
    #[snafu(display(
        "{field} includes a non-ASCII or non-printable (0x20-0x7E) character at byte {position}"
    ))]
    InvalidCharacter {
        field: &'static str,
        position: usize,
    },

    /// The text is longer than [`MAX_FIELD_LEN`].
    #[snafu(display("{field} is longer than the allowed maximum size ({limit})"))]
    TooLong { field: &'static str, limit: usize },

    /// The text contains the field separator.
    #[snafu(display("{field} '{value}' contains invalid character ':'"))]
    ContainsColon { field: &'static str, value: String },

    /// Username cannot be empty.
    #[snafu(display("Username cannot be empty"))]
    EmptyUser,
}

/// Rejects any character below 0x20 or above 0x7E.
///
/// `field` names the offending value in the error message; the value itself
/// is never echoed, so this is safe to call on passwords.
pub fn check_printable_ascii(field: &'static str, text: &str) -> Result<(), Error> {
    match text.char_indices().find(|(_, c)| !(' '..='~').contains(c)) {
        Some((position, _)) => InvalidCharacterSnafu { field, position }.fail(),
        None => Ok(()),
    }
}

/// Rejects text longer than [`MAX_FIELD_LEN`] bytes.
pub fn check_field_length(field: &'static str, text: &str) -> Result<(), Error> {
    ensure!(
        text.len() <= MAX_FIELD_LEN,
        TooLongSnafu {
            field,
            limit: MAX_FIELD_LEN
        }
    );
    Ok(())
}

/// Full check for a user or realm that is about to become part of a record.
pub fn check_field(field: &'static str, text: &str) -> Result<(), Error> {
    check_printable_ascii(field, text)?;
    check_field_length(field, text)?;
    ensure!(
        !text.contains(':'),
        ContainsColonSnafu { field, value: text }
    );
    Ok(())
}

/// [`check_field`] for a username, which additionally must not be empty.
pub fn check_user(user: &str) -> Result<(), Error> {
    ensure!(!user.is_empty(), EmptyUserSnafu);
    check_field("user", user)
}
