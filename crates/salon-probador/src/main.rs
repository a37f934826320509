//! salon-probador: data fix-ups for salon e2e suites
//!
//! ## Usage
//!
//! ```bash
//! salon-probador env list
//! salon-probador --env prod env show
//! salon-probador membership freeze --client "Jane Doe"
//! salon-probador course archive --name "Balayage 101"
//! salon-probador appointment delete --staff "Mary" --date 2024-03-01
//! ```

use clap::Parser;
use salon_probar::SuiteConfig;
use salon_probador::{handlers, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    // Build configuration from CLI args
    let config = build_config(&cli);
    init_tracing(&config);

    let suite = match &cli.config {
        Some(path) => SuiteConfig::load(path)?,
        None => SuiteConfig::builtin(),
    };

    let output = if cli.command.needs_gateway() {
        run_gateway_command(&cli, &suite, &cli.command)?
    } else {
        handlers::local_command(&suite, cli.env.as_deref(), &cli.command)?
    };
    println!("{output}");
    Ok(())
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_json_logs(cli.json_logs)
}

/// Logs go to stderr; `RUST_LOG` overrides the verbosity flags
fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.filter_directive()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.color.should_color())
        .with_target(config.verbosity.is_verbose());

    let _ = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(feature = "http")]
fn run_gateway_command(cli: &Cli, suite: &SuiteConfig, command: &Commands) -> CliResult<String> {
    use salon_probador::CliError;

    let env = suite.select(cli.env.as_deref())?;
    tracing::info!("{}", env.banner());

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::config(format!("Failed to create async runtime: {e}")))?;
    runtime.block_on(gateway::execute(cli.token.as_deref(), suite, env, command))
}

#[cfg(not(feature = "http"))]
fn run_gateway_command(_cli: &Cli, _suite: &SuiteConfig, _command: &Commands) -> CliResult<String> {
    Err(salon_probador::CliError::config(
        "built without the `http` feature; only `env` is available",
    ))
}

#[cfg(feature = "http")]
mod gateway {
    use salon_probar::auth::fetch_token;
    use salon_probar::{memberships, Environment, HttpTransport, RunContext, SuiteConfig};
    use salon_probador::{handlers, CliError, CliResult, Commands};

    pub async fn execute(
        token: Option<&str>,
        suite: &SuiteConfig,
        env: Environment,
        command: &Commands,
    ) -> CliResult<String> {
        let token = match token.filter(|t| !t.is_empty()) {
            Some(token) => token.to_string(),
            None => {
                let client = reqwest::Client::builder()
                    .timeout(suite.timeouts().get("API_CALL"))
                    .build()
                    .map_err(|e| CliError::config(format!("HTTP client: {e}")))?;
                fetch_token(&client, &env).await?
            }
        };

        let mut ctx = RunContext::new(env, token).with_timeouts(suite.timeouts().clone());
        if matches!(command, Commands::Membership(_)) {
            ctx = ctx.with_instance_id(memberships::INSTANCE_ID);
        }
        tracing::debug!(token = %ctx.token_preview(), instance = ctx.instance_id(), "gateway context ready");

        let gateway = HttpTransport::new(ctx)?;
        handlers::gateway_command(&gateway, command).await
    }
}
