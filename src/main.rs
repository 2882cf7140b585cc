use std::ffi::OsString;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use compose_runner::{
    exit_code_for_compose_error, CancelToken, Compose, ComposeError, HandleSource, Settings,
};

const CANCELED_EXIT_CODE: i32 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "compose-runner",
    version,
    about = "Run docker-compose against the active project, installing it if needed."
)]
struct Cli {
    /// Print debug diagnostics to stderr
    #[arg(long)]
    verbose: bool,

    /// Resolve (and install if needed) docker-compose, print its path and exit
    #[arg(long)]
    which: bool,

    /// Cancel the run after this long (e.g. 30s, 5m)
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Arguments forwarded verbatim to docker-compose
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<OsString>,
}

fn cancel_token(timeout: Option<Duration>) -> anyhow::Result<CancelToken> {
    let token = CancelToken::new();
    for sig in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        // A second signal exits at once, even if a download read is stalled.
        signal_hook::flag::register_conditional_shutdown(sig, CANCELED_EXIT_CODE, token.flag())
            .with_context(|| format!("cannot install shutdown handler for signal {sig}"))?;
        signal_hook::flag::register(sig, token.flag())
            .with_context(|| format!("cannot install handler for signal {sig}"))?;
    }
    Ok(match timeout {
        Some(t) => token.with_timeout(t),
        None => token,
    })
}

fn print_which(compose: &Compose, cancel: &CancelToken) -> Result<(), ComposeError> {
    let handle = compose.resolve(cancel)?;
    println!("{}", handle.path().display());
    match (handle.source(), handle.version()) {
        (HandleSource::Installed, Some(v)) => {
            eprintln!("compose-runner: using installed container alternative v{v}")
        }
        _ => eprintln!("compose-runner: using docker-compose from PATH"),
    }
    Ok(())
}

fn report(e: &ComposeError) {
    eprintln!("compose-runner: {e}");
    if e.suggests_manual_install() {
        eprintln!(
            "compose-runner: install docker-compose and make sure it is on PATH, then retry."
        );
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    compose_runner::telemetry::init(cli.verbose);
    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        build_target = env!("COMPOSE_RUNNER_BUILD_TARGET"),
        built = env!("COMPOSE_RUNNER_BUILD_DATE"),
        "compose-runner starting"
    );

    let cancel = match cancel_token(cli.timeout) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("compose-runner: {e:#}");
            return ExitCode::from(1);
        }
    };

    let compose = Compose::from_settings(&Settings::from_env());
    let result = if cli.which {
        print_which(&compose, &cancel)
    } else {
        compose.run(&cancel, &cli.args)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::from(exit_code_for_compose_error(&e))
        }
    }
}
