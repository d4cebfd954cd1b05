//! Persisting a rewritten password file.
//!
//! Both modes build the new content in a temporary file next to the target
//! and rename it over the target once it is complete, so a failure at any
//! point leaves the original file as it was. The temporary file is removed
//! on every error path when the [`NamedTempFile`] is dropped.

use crate::line::SecretSource;
use crate::record::Target;
use crate::rewrite::{self, Outcome, rewrite};
use snafu::{ResultExt, Snafu};
use std::fs::{self, File, Permissions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Errors that can occur while creating or updating a password file.
#[derive(Debug, Snafu)]
pub enum Error {
    /// The existing password file could not be opened for reading.
    #[snafu(display("Could not open passwd file '{}' for reading", path.display()))]
    OpenSource { source: io::Error, path: PathBuf },

    /// A new password file could not be created.
    #[snafu(display("Could not open passwd file '{}'", path.display()))]
    CreateTarget { source: io::Error, path: PathBuf },

    /// No temporary file could be created next to the target.
    #[snafu(display("Could not open temp file in '{}'", dir.display()))]
    TempFile { source: io::Error, dir: PathBuf },

    /// The rewrite itself failed.
    #[snafu(display("Failed to update passwd file '{}'", path.display()))]
    Rewrite {
        source: rewrite::Error,
        path: PathBuf,
    },

    /// Failed to flush the temporary file.
    #[snafu(display("Failed to write temp file '{}'", path.display()))]
    WriteTemp { source: io::Error, path: PathBuf },

    /// Failed to carry the permissions of the original file over.
    #[snafu(display("Failed to set permissions on temp file '{}'", path.display()))]
    Permissions { source: io::Error, path: PathBuf },

    /// The temporary file could not replace the target.
    #[snafu(display("Unable to update file '{}'", path.display()))]
    Persist {
        source: tempfile::PersistError,
        path: PathBuf,
    },
}

/// Replace whatever is at `path` with a file holding a single record.
///
/// The password is read and validated before the target is touched. An
/// existing file keeps its permissions; a new one is created with mode
/// `0600` on Unix.
pub fn create<S: SecretSource + ?Sized>(
    path: impl AsRef<Path>,
    target: &Target,
    secret: &mut S,
    notices: &mut dyn Write,
) -> Result<(), Error> {
    let path = path.as_ref();
    let permissions = fs::metadata(path).ok().map(|meta| meta.permissions());
    let mut temp = temp_file_for(path).context(CreateTargetSnafu { path })?;

    write_temp(&mut temp, path, |writer| {
        rewrite(&mut io::empty(), writer, target, secret, notices)
    })?;
    persist(temp, path, permissions)?;

    log::debug!("Created '{}'", path.display());
    Ok(())
}

/// Change or add the record for `target` in the existing file at `path`.
///
/// Fails with [`Error::OpenSource`] when the file does not exist or cannot be
/// read; use [`create`] for new files.
pub fn update<S: SecretSource + ?Sized>(
    path: impl AsRef<Path>,
    target: &Target,
    secret: &mut S,
    notices: &mut dyn Write,
) -> Result<Outcome, Error> {
    let path = path.as_ref();
    let source = File::open(path).context(OpenSourceSnafu { path })?;
    let permissions = source
        .metadata()
        .context(OpenSourceSnafu { path })?
        .permissions();
    let mut temp = temp_file_for(path).context(TempFileSnafu {
        dir: parent_dir(path),
    })?;

    let mut reader = BufReader::new(source);
    let outcome = write_temp(&mut temp, path, |writer| {
        rewrite(&mut reader, writer, target, secret, notices)
    })?;
    drop(reader);
    persist(temp, path, Some(permissions))?;

    log::debug!("Updated '{}': {outcome:?}", path.display());
    Ok(outcome)
}

/// Directory that holds `path`, with the current directory standing in for
/// bare file names.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn temp_file_for(path: &Path) -> io::Result<NamedTempFile> {
    let temp = tempfile::Builder::new()
        .prefix(".htdigest.")
        .suffix(".tmp")
        .tempfile_in(parent_dir(path))?;
    log::debug!("Using temp file '{}'", temp.path().display());
    Ok(temp)
}

fn write_temp<T>(
    temp: &mut NamedTempFile,
    path: &Path,
    fill: impl FnOnce(&mut BufWriter<&mut File>) -> Result<T, rewrite::Error>,
) -> Result<T, Error> {
    let temp_path = temp.path().to_path_buf();
    let mut writer = BufWriter::new(temp.as_file_mut());
    let value = fill(&mut writer).context(RewriteSnafu { path })?;
    writer.flush().context(WriteTempSnafu { path: &temp_path })?;
    drop(writer);
    temp.as_file()
        .sync_all()
        .context(WriteTempSnafu { path: &temp_path })?;
    Ok(value)
}

fn persist(temp: NamedTempFile, path: &Path, permissions: Option<Permissions>) -> Result<(), Error> {
    if let Some(permissions) = permissions {
        temp.as_file()
            .set_permissions(permissions)
            .context(PermissionsSnafu { path: temp.path() })?;
    }
    temp.persist(path).context(PersistSnafu { path })?;
    Ok(())
}
