use std::io::IsTerminal;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use diffaid::check::Check;
use diffaid::cli::Cli;
use diffaid::config::Config;
use diffaid::error::Result;
use diffaid::gemini::GeminiEngine;
use diffaid::git::GitDiffSource;
use diffaid::report::{self, ExitStatus};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<ExitStatus> {
    let cwd = std::env::current_dir()?;
    let config = Config::load(cli, &cwd)?;
    debug!(?config, "config loaded");

    let source = GitDiffSource::new(&cwd);
    let mut stdout = std::io::stdout().lock();
    Check::from_config(&config).run(&source, || GeminiEngine::new(&config), &mut stdout)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    report::configure_color();

    info!("diffaid starting");

    let status = match run(&cli) {
        Ok(status) => status,
        Err(e) => {
            report::configure_stderr_color();
            eprintln!("{}", report::render_error(&e));
            ExitStatus::ToolError
        }
    };
    std::process::exit(status.code());
}
