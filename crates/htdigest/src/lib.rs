#![warn(missing_docs)]

//! A lightweight alternative to Apache's htdigest tool.
//!
//! This library creates and maintains digest password files: flat text files
//! of `user:realm:digest` lines, where the digest is the MD5 hash of
//! `user:realm:password` in lowercase hex.
//!
//! Updates are done in a single pass that keeps every unrelated line (comments,
//! blank lines, malformed lines, other users) byte for byte, and the result is
//! committed by renaming a temporary file over the original.
//!
//! # Example
//!
//! ```no_run
//! use htdigest::{LineSecret, Outcome, Target};
//! use std::io;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let target = Target::new("alice", "private area")?;
//! let mut secret = LineSecret::new(io::stdin().lock());
//!
//! // Change alice's password, or add her if she has no entry yet
//! let outcome = htdigest::update(".htdigest", &target, &mut secret, &mut io::stderr())?;
//! assert!(matches!(outcome, Outcome::Changed | Outcome::Added));
//!
//! // Check the password that was just stored
//! if htdigest::verify_user(".htdigest", &target, "password123")? {
//!     println!("Password correct!");
//! }
//! # Ok(())
//! # }
//! ```

mod commit;
mod digest;
mod line;
mod lookup;
mod record;
mod rewrite;
mod validate;

pub use commit::{Error as CommitError, create, update};
pub use digest::{DIGEST_LEN, compute_digest, verify_digest};
pub use line::{Error as LineError, LineSecret, SecretSource, read_line};
pub use lookup::{Error as LookupError, find_record, verify_user};
pub use record::{
    Error as RecordError, Record, RecordFields, Target, format_record, parse_record,
};
pub use rewrite::{Error as RewriteError, Outcome, rewrite};
pub use validate::{
    Error as ValidationError, MAX_FIELD_LEN, MAX_LINE_LEN, MAX_STRING_LEN, check_printable_ascii,
};
