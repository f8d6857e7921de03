use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use deckhand_core::ResourceKind;

#[derive(Parser)]
#[command(name = "deckhand")]
#[command(about = "Deckhand: reconcile projects, applications and env vars on your deployment platform")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL, e.g. https://deploy.example.com/api/v1 (overrides config)
    #[arg(short, long, global = true, env = "DECKHAND_URL")]
    pub server: Option<String>,

    /// API token (overrides stored credentials)
    #[arg(long, global = true, env = "DECKHAND_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "DECKHAND_PROFILE", default_value = "default")]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store the --token / DECKHAND_TOKEN value for this profile
    Login,
    /// Logout (remove stored credentials)
    Logout,
    /// Show current auth info
    Whoami,
    /// List resources of a kind
    List(ListArgs),
    /// Look a resource up by name
    Resolve(ResolveArgs),
    /// Create a resource unless one with the same name exists
    Ensure(EnsureArgs),
    /// Application environment variables
    Env(EnvArgs),
    /// Trigger a deployment
    Deploy(DeployArgs),
    /// Show application status
    Status(AppArgs),
    /// Reconcile everything described by a manifest
    Apply(ApplyArgs),
    /// Manage CLI configuration
    Config(ConfigArgs),
}

/// Kinds that can be listed and resolved by name.
#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    #[value(alias = "projects")]
    Project,
    #[value(alias = "servers")]
    Server,
    #[value(alias = "applications", alias = "app", alias = "apps")]
    Application,
    #[value(alias = "services")]
    Service,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Project => ResourceKind::Project,
            KindArg::Server => ResourceKind::Server,
            KindArg::Application => ResourceKind::Application,
            KindArg::Service => ResourceKind::Service,
        }
    }
}

#[derive(clap::Args)]
pub struct ListArgs {
    pub kind: KindArg,
}

#[derive(clap::Args)]
pub struct ResolveArgs {
    pub kind: KindArg,
    pub name: String,
}

#[derive(clap::Args)]
pub struct EnsureArgs {
    #[command(subcommand)]
    pub command: EnsureCommands,
}

#[derive(Subcommand)]
pub enum EnsureCommands {
    /// Ensure a project exists
    Project {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(clap::Args)]
pub struct AppArgs {
    /// Application name
    #[arg(short, long)]
    pub app: String,
}

#[derive(clap::Args)]
pub struct EnvArgs {
    #[command(subcommand)]
    pub command: EnvCommands,
}

#[derive(Subcommand)]
pub enum EnvCommands {
    /// List the application's variables
    List(AppArgs),
    /// Push an env file, writing only what changed
    Sync(EnvSyncArgs),
}

#[derive(clap::Args)]
pub struct EnvSyncArgs {
    /// Application name
    #[arg(short, long)]
    pub app: String,
    /// KEY=VALUE file to sync
    #[arg(long, default_value = ".env")]
    pub file: PathBuf,
    /// Keys to leave alone (added to the profile's reserved_keys)
    #[arg(long = "reserve", value_name = "KEY")]
    pub reserve: Vec<String>,
    /// Write preview-deployment variables instead of production ones
    #[arg(long)]
    pub preview: bool,
    /// Make variables available at build time
    #[arg(long)]
    pub build_time: bool,
}

#[derive(clap::Args)]
pub struct DeployArgs {
    /// Application name
    #[arg(short, long)]
    pub app: String,
    /// Rebuild without cache
    #[arg(long)]
    pub force: bool,
    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(clap::Args)]
pub struct WaitArgs {
    /// Poll until the deployment settles
    #[arg(long)]
    pub wait: bool,
    /// Give up waiting after this many seconds
    #[arg(long, default_value_t = 600)]
    pub wait_timeout: u64,
}

#[derive(clap::Args)]
pub struct ApplyArgs {
    /// Desired-state manifest
    #[arg(default_value = "deckhand.toml")]
    pub manifest: PathBuf,
    /// Deploy the application after reconciling
    #[arg(long)]
    pub deploy: bool,
    /// Rebuild without cache when deploying
    #[arg(long)]
    pub force: bool,
    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (server, format, timeout_secs, poll_interval_secs, reserved_keys)
    pub key: String,
    /// Value (comma-separated for reserved_keys)
    pub value: String,
}
