use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use htdigest::{CommitError, LineSecret, Outcome, SecretSource, Target};
use snafu::ResultExt;
use std::ffi::{OsStr, OsString};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;
use zeroize::Zeroizing;

/// A lightweight alternative to Apache's htdigest tool.
#[derive(Parser)]
#[command(name = "htdigest")]
#[command(version, about, long_about = None)]
#[command(override_usage = "htdigest [-c] passwordfile realm username")]
struct Cli {
    /// Create a new file, replacing any existing one (must come first)
    #[arg(short = 'c')]
    create: bool,
    /// Path to the password file
    passwordfile: PathBuf,
    /// Authentication realm
    realm: String,
    /// Username to add or update
    username: String,
}

type Result<T> = ::std::result::Result<T, snafu::Whatever>;

/// Prompts on the terminal without echo.
struct Prompt;

impl SecretSource for Prompt {
    fn read_secret(&mut self) -> ::std::result::Result<Zeroizing<String>, htdigest::LineError> {
        rpassword::prompt_password("New password: ")
            .map(Zeroizing::new)
            .map_err(|source| htdigest::LineError::Read { source })
    }
}

fn secret_source() -> Box<dyn SecretSource> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        Box::new(Prompt)
    } else {
        Box::new(LineSecret::new(stdin.lock()))
    }
}

fn run(cli: Cli) -> Result<()> {
    let target =
        Target::new(cli.username, cli.realm).whatever_context("Invalid user or realm")?;
    let mut secret = secret_source();
    let mut notices = io::stderr();
    let file = cli.passwordfile;

    if cli.create {
        htdigest::create(&file, &target, &mut *secret, &mut notices)
            .whatever_context("Can't create password file")?;
        log::info!("Created {} with a single record", file.display());
        return Ok(());
    }

    let result = htdigest::update(&file, &target, &mut *secret, &mut notices);
    if let Err(CommitError::OpenSource { .. }) = &result {
        return result
            .map(drop)
            .whatever_context("Can't open password file, use -c option to create a new one");
    }
    match result.whatever_context("Can't update password file")? {
        Outcome::Changed => log::info!("Changed record in {}", file.display()),
        Outcome::Added => log::info!("Added record to {}", file.display()),
    }
    Ok(())
}

/// Parse the command line, allowing `-c` only as the very first argument.
fn parse_args_from(args: Vec<OsString>) -> ::std::result::Result<Cli, clap::Error> {
    let cli = Cli::try_parse_from(&args)?;
    let flag_first = args.get(1).map(OsString::as_os_str) == Some(OsStr::new("-c"));
    if cli.create && !flag_first {
        return Err(Cli::command().error(
            ErrorKind::ArgumentConflict,
            "the -c flag must be the first argument",
        ));
    }
    Ok(cli)
}

fn parse_args() -> Cli {
    parse_args_from(std::env::args_os().collect()).unwrap_or_else(|err| {
        if !err.use_stderr() {
            err.exit()
        }
        // Usage errors exit with 1 rather than clap's 2.
        let _ = err.print();
        process::exit(1)
    })
}

fn init_logging() {
    env_logger::Builder::from_env(
        env_logger::Env::new()
            .filter_or("HTDIGEST_LOG", "warn")
            .write_style("HTDIGEST_LOG_STYLE"),
    )
    .init();
}

#[snafu::report]
fn main() -> Result<()> {
    init_logging();
    run(parse_args())
}
