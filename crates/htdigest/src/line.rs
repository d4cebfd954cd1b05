//! Line reading and password acquisition.

use crate::validate::MAX_LINE_LEN;
use snafu::{ResultExt, Snafu, ensure};
use std::io::{self, BufRead, Read};
use zeroize::Zeroizing;

/// Errors that can occur while reading a single line.
#[derive(Debug, Snafu)]
pub enum Error {
    /// The underlying stream failed.
    #[snafu(display("Can't read line"))]
    Read { source: io::Error },

    /// The stream ended before any byte of the line was read.
    #[snafu(display("Detected end of input while reading line"))]
    Eof,

    /// The line exceeds [`MAX_LINE_LEN`].
    #[snafu(display("Line is longer than the allowed maximum size ({limit})"))]
    TooLong { limit: usize },

    /// The line is not valid UTF-8.
    #[snafu(display("Line is not valid UTF-8"))]
    InvalidEncoding,
}

/// Strips a trailing `\n` or `\r\n` (or a lone `\r`) from a raw line.
pub fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Reads one line of text, without its terminator.
///
/// A final line that is not newline-terminated is returned as is; an empty
/// line is a valid, empty result. Only a stream that is already exhausted
/// yields [`Error::Eof`].
pub fn read_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<Zeroizing<String>, Error> {
    let mut buf = Zeroizing::new(Vec::new());
    // Room for the longest accepted line plus "\r\n".
    let limit = MAX_LINE_LEN as u64 + 2;
    let read = Read::take(&mut *reader, limit)
        .read_until(b'\n', &mut *buf)
        .context(ReadSnafu)?;
    ensure!(read != 0, EofSnafu);

    let content = strip_terminator(&buf);
    ensure!(
        content.len() <= MAX_LINE_LEN,
        TooLongSnafu {
            limit: MAX_LINE_LEN
        }
    );
    let text = std::str::from_utf8(content).map_err(|_| Error::InvalidEncoding)?;
    Ok(Zeroizing::new(text.to_owned()))
}

/// Something that hands out the new password when a record is written.
///
/// The rewrite engine asks for the password lazily, exactly once, at the
/// point where it emits the new record.
pub trait SecretSource {
    /// Reads the password.
    fn read_secret(&mut self) -> Result<Zeroizing<String>, Error>;
}

impl<S: SecretSource + ?Sized> SecretSource for &mut S {
    fn read_secret(&mut self) -> Result<Zeroizing<String>, Error> {
        (**self).read_secret()
    }
}

/// A [`SecretSource`] that reads the first line of a stream.
#[derive(Debug)]
pub struct LineSecret<R> {
    reader: R,
}

impl<R: BufRead> LineSecret<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> SecretSource for LineSecret<R> {
    fn read_secret(&mut self) -> Result<Zeroizing<String>, Error> {
        read_line(&mut self.reader)
    }
}
