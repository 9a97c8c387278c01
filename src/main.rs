use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use farmrun::config::Config;
use farmrun::dispatch::{DispatchLoop, DispatchRequest};
use farmrun::error::{FarmError, Result};
use farmrun::executor::ShellRunner;
use farmrun::palette::Palette;
use farmrun::pool::HostPool;
use farmrun::sampler::OsLoadSampler;
use farmrun::shutdown;

#[derive(Parser, Debug)]
#[command(name = "farmrun")]
#[command(version)]
#[command(about = "Run a command on the first underloaded host of a compile farm")]
struct Args {
    /// Slot weight this task counts for against the load ceiling
    #[arg(
        short = 'n',
        long = "np",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    np: u32,

    /// Print the total slot count of the configured pool and exit
    #[arg(long)]
    count: bool,

    /// Command to run; everything from the first non-flag token onward
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

/// Accept the historical `-np N` spelling alongside clap's `-n`/`--np`.
///
/// Only the leading flag region is rewritten; everything from the first
/// non-flag token onward is the opaque command and passes through verbatim,
/// so a `-np` inside the command is left alone.
fn normalize_args<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
    let mut out = Vec::new();
    let mut iter = args.into_iter();
    if let Some(program) = iter.next() {
        out.push(program);
    }

    let mut in_flags = true;
    let mut expect_value = false;
    for arg in iter {
        if in_flags {
            if expect_value {
                expect_value = false;
            } else if arg == "-np" {
                out.push("--np".to_string());
                expect_value = true;
                continue;
            } else if arg == "-n" || arg == "--np" {
                expect_value = true;
            } else if !(arg.starts_with('-') && arg.len() > 1) {
                in_flags = false;
            }
        }
        out.push(arg);
    }
    out
}

fn parse_args() -> Args {
    match Args::try_parse_from(normalize_args(std::env::args())) {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => {
            // Usage errors exit 1.
            let _ = e.print();
            std::process::exit(1);
        }
    }
}

fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}

async fn run(args: Args) -> Result<i32> {
    let config = Config::from_env()?;
    let local_host = local_hostname();

    let pool = match &config.hosts {
        Some(spec) => HostPool::parse(spec)?,
        // Fallback pool: this machine, one slot.
        None => HostPool::single(local_host.clone()),
    };

    if args.count {
        println!("{}", pool.total_capacity());
        return Ok(0);
    }

    if args.command.is_empty() {
        return Err(FarmError::Config(
            "no command given (usage: farmrun [--np N] COMMAND...)".to_string(),
        ));
    }

    let limit = config.require_max_load()?;
    let request = DispatchRequest::new(args.command.join(" "), args.np, limit)?;
    let palette = Palette::parse(&config.colors);
    let cwd = std::env::current_dir()?;

    let sampler = OsLoadSampler::new(local_host.clone(), config.remote_shell.clone());
    let runner = ShellRunner::new(
        config.remote_shell,
        cwd,
        config.setup_file,
        config.setup_marker,
    );

    let token = shutdown::install_shutdown_handler();
    let mut dispatch = DispatchLoop::new(pool, palette, request, local_host, sampler, runner);

    match dispatch.run(token).await? {
        Some(outcome) => {
            tracing::info!(
                host = %outcome.host,
                exit_status = outcome.exit_status,
                "Command finished"
            );
            Ok(outcome.exit_status)
        }
        // Externally cancelled before any slot was claimed.
        None => Ok(130),
    }
}

#[tokio::main]
async fn main() {
    let args = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("farmrun: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Args, clap::Error> {
        Args::try_parse_from(normalize_args(args.iter().map(|a| a.to_string())))
    }

    #[test]
    fn np_and_command_round_trip() {
        let args = Args::try_parse_from(["farmrun", "--np", "4", "echo", "hi"]).unwrap();
        assert_eq!(args.np, 4);
        assert_eq!(args.command.join(" "), "echo hi");
    }

    #[test]
    fn historical_np_spelling_accepted() {
        let args = parse(&["farmrun", "-np", "4", "echo", "hi"]).unwrap();
        assert_eq!(args.np, 4);
        assert_eq!(args.command.join(" "), "echo hi");
    }

    #[test]
    fn np_inside_the_command_is_untouched() {
        let args = parse(&["farmrun", "report", "-np", "4"]).unwrap();
        assert_eq!(args.np, 1);
        assert_eq!(args.command.join(" "), "report -np 4");
    }

    #[test]
    fn unknown_leading_flag_still_rejected_after_normalization() {
        assert!(parse(&["farmrun", "-x", "echo", "hi"]).is_err());
    }

    #[test]
    fn weight_defaults_to_one() {
        let args = Args::try_parse_from(["farmrun", "true"]).unwrap();
        assert_eq!(args.np, 1);
        assert_eq!(args.command, vec!["true"]);
    }

    #[test]
    fn flags_after_first_token_belong_to_the_command() {
        let args = Args::try_parse_from(["farmrun", "ls", "-la", "--np", "9"]).unwrap();
        assert_eq!(args.np, 1);
        assert_eq!(args.command.join(" "), "ls -la --np 9");
    }

    #[test]
    fn unknown_leading_flag_is_an_error() {
        assert!(Args::try_parse_from(["farmrun", "-x", "echo", "hi"]).is_err());
    }

    #[test]
    fn zero_weight_rejected() {
        assert!(Args::try_parse_from(["farmrun", "--np", "0", "true"]).is_err());
    }

    #[test]
    fn count_mode_needs_no_command() {
        let args = Args::try_parse_from(["farmrun", "--count"]).unwrap();
        assert!(args.count);
        assert!(args.command.is_empty());
    }
}
