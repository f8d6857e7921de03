mod auth;
mod cli;
mod commands;
mod config;
mod observability;
mod output;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use deckhand_core::config::DEFAULT_REQUEST_TIMEOUT;
use deckhand_core::{ClientConfig, Reconciler};

use cli::{Cli, Commands, OutputFormat, WaitArgs};
use config::ProfileConfig;
use output::print_error;

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    observability::init_tracing_with_level(observability::level_for(cli.verbose));
    if let Err(e) = dotenv {
        // Only warn if the error is something other than file not found
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            tracing::warn!(error = %e, "failed to load .env");
        }
    }

    if let Err(e) = run(cli).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let profile = cli.profile.as_str();

    // Credential commands never read config.toml.
    match &cli.command {
        Commands::Login => {
            let server = config::resolve_server(&cli.server, profile)?;
            let token = cli
                .token
                .as_deref()
                .context("--token (or DECKHAND_TOKEN) is required to log in")?;
            commands::auth::login(&server, token, profile)?;
        }
        Commands::Logout => {
            commands::auth::logout(profile)?;
        }
        Commands::Whoami => {
            commands::auth::whoami(profile)?;
        }
        Commands::Config(args) => match &args.command {
            cli::ConfigCommands::Show => show_config(profile, &config::load_profile(profile)?),
            cli::ConfigCommands::Set(set_args) => {
                let mut cfg = config::load_profile(profile)?;
                let value = set_args.value.clone();
                match set_args.key.as_str() {
                    "server" => cfg.server = Some(value),
                    "format" => {
                        OutputFormat::from_str(&value, true)
                            .map_err(|e| anyhow::anyhow!("Invalid format \"{value}\": {e}"))?;
                        cfg.format = Some(value);
                    }
                    "timeout_secs" => cfg.timeout_secs = Some(parse_secs(&value)?),
                    "poll_interval_secs" => cfg.poll_interval_secs = Some(parse_secs(&value)?),
                    "reserved_keys" => {
                        cfg.reserved_keys = value
                            .split(',')
                            .map(str::trim)
                            .filter(|k| !k.is_empty())
                            .map(String::from)
                            .collect();
                    }
                    other => anyhow::bail!(
                        "Unknown config key: {other}. Valid keys: server, format, timeout_secs, poll_interval_secs, reserved_keys"
                    ),
                }
                config::save_profile(profile, &cfg)?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
            }
        },
        Commands::List(args) => {
            let (cfg, format) = settings(&cli)?;
            let rec = make_reconciler(&cli, &cfg, &[])?;
            commands::resources::list(&rec, args.kind.into(), format).await?;
        }
        Commands::Resolve(args) => {
            let (cfg, format) = settings(&cli)?;
            let mut rec = make_reconciler(&cli, &cfg, &[])?;
            commands::resources::resolve(&mut rec, args.kind.into(), &args.name, format).await?;
        }
        Commands::Ensure(args) => match &args.command {
            cli::EnsureCommands::Project { name, description } => {
                let (cfg, format) = settings(&cli)?;
                let mut rec = make_reconciler(&cli, &cfg, &[])?;
                commands::resources::ensure_project(&mut rec, name, description.clone(), format)
                    .await?;
            }
        },
        Commands::Env(args) => match &args.command {
            cli::EnvCommands::List(app) => {
                let (cfg, format) = settings(&cli)?;
                let mut rec = make_reconciler(&cli, &cfg, &[])?;
                commands::env::list(&mut rec, &app.app, format).await?;
            }
            cli::EnvCommands::Sync(sync) => {
                let (cfg, format) = settings(&cli)?;
                let mut rec = make_reconciler(&cli, &cfg, &sync.reserve)?;
                commands::env::sync(
                    &mut rec,
                    &sync.app,
                    &sync.file,
                    sync.preview,
                    sync.build_time,
                    format,
                )
                .await?;
            }
        },
        Commands::Deploy(args) => {
            let (cfg, format) = settings(&cli)?;
            let mut rec = make_reconciler(&cli, &cfg, &[])?;
            commands::deploy::deploy(&mut rec, &args.app, args.force, wait_for(&args.wait), format)
                .await?;
        }
        Commands::Status(args) => {
            let (cfg, format) = settings(&cli)?;
            let mut rec = make_reconciler(&cli, &cfg, &[])?;
            commands::deploy::status(&mut rec, &args.app, format).await?;
        }
        Commands::Apply(args) => {
            let (cfg, format) = settings(&cli)?;
            let mut rec = make_reconciler(&cli, &cfg, &[])?;
            commands::apply::apply(
                &mut rec,
                &args.manifest,
                args.deploy,
                args.force,
                wait_for(&args.wait),
                format,
            )
            .await?;
        }
    }

    Ok(())
}

/// The active profile's config.toml table and the output format it implies.
fn settings(cli: &Cli) -> Result<(ProfileConfig, OutputFormat)> {
    let cfg = config::load_profile(&cli.profile)?;
    let format = resolve_format(cli.format, &cfg)?;
    Ok((cfg, format))
}

fn make_reconciler(cli: &Cli, cfg: &ProfileConfig, extra_reserved: &[String]) -> Result<Reconciler> {
    let server = config::resolve_server(&cli.server, &cli.profile)?;
    let token = auth::resolve_token(&cli.token, &cli.profile)?;
    let timeout = cli
        .timeout
        .or(cfg.timeout_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
    let client = ClientConfig::new(&server, token)?.with_request_timeout(timeout);
    let reconcile = cfg.reconcile_config(extra_reserved);
    Reconciler::new(&client, reconcile).context("Invalid client configuration")
}

fn resolve_format(flag: Option<OutputFormat>, cfg: &ProfileConfig) -> Result<OutputFormat> {
    if let Some(format) = flag {
        return Ok(format);
    }
    match cfg.format.as_deref() {
        Some(name) => OutputFormat::from_str(name, true)
            .map_err(|e| anyhow::anyhow!("Invalid format \"{name}\" in config: {e}")),
        None => Ok(OutputFormat::default()),
    }
}

fn wait_for(args: &WaitArgs) -> Option<Duration> {
    args.wait.then(|| Duration::from_secs(args.wait_timeout))
}

fn parse_secs(value: &str) -> Result<u64> {
    value
        .parse()
        .with_context(|| format!("Expected a number of seconds, got \"{value}\""))
}

fn show_config(profile: &str, cfg: &ProfileConfig) {
    println!("{}: {}", "Profile".cyan(), profile);
    println!(
        "{}: {}",
        "Server".cyan(),
        cfg.server.as_deref().unwrap_or("(not set)")
    );
    println!(
        "{}: {}",
        "Format".cyan(),
        cfg.format.as_deref().unwrap_or("json")
    );
    println!(
        "{}: {}s",
        "Timeout".cyan(),
        cfg.timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT.as_secs())
    );
    if let Some(poll) = cfg.poll_interval_secs {
        println!("{}: {poll}s", "Poll interval".cyan());
    }
    if !cfg.reserved_keys.is_empty() {
        println!("{}: {}", "Reserved keys".cyan(), cfg.reserved_keys.join(", "));
    }
    if cfg.endpoints.is_some() {
        println!("{}: (custom)", "Endpoints".cyan());
    }
}
