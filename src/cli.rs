//! Command-line handling shared by `vault-exports` and `vault-ec2-exports`.

use clap::{Args, Parser};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::envvar::{Environment, ProcessEnvironment};
use crate::errors::*;
use crate::export::{ExportLine, ExportMode};
use crate::vault::{self, BootstrapConfig, Client};

/// Flags which older deployments pass with a single dash, Go style.
const LEGACY_FLAGS: &[&str] = &["secrets", "exports", "nonce-filename"];

// Flags shared by both binaries.
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Comma separated list of secrets to fetch
    #[arg(long, value_name = "PATHS", value_delimiter = ',')]
    pub secrets: Vec<String>,

    /// Comma separated list of exports, each NAME=secret.field
    #[arg(long, value_name = "EXPORTS", value_delimiter = ',')]
    pub exports: Vec<String>,

    /// Address of the Vault server
    #[arg(long, value_name = "URL", env = "VAULT_ADDR", default_value = vault::DEFAULT_ADDR)]
    pub vault_addr: String,
}

impl ExportArgs {
    /// Check our arguments and turn them into a `Config`.
    pub fn config(&self, mode: ExportMode) -> Result<Config> {
        Config::new(&self.secrets, &self.exports, mode)
    }
}

/// Print Vault secrets as shell exports, using the token in VAULT_TOKEN or
/// ~/.vault-token. Variables which are already set are left alone.
#[derive(Debug, Parser)]
#[command(name = "vault-exports", version)]
pub struct ReaderArgs {
    #[command(flatten)]
    pub export: ExportArgs,
}

/// Log into Vault with this EC2 instance's identity and print secrets as
/// shell exports.
#[derive(Debug, Parser)]
#[command(name = "vault-ec2-exports", version)]
pub struct BootstrapArgs {
    #[command(flatten)]
    pub export: ExportArgs,

    /// Path to the file containing the vault nonce
    #[arg(long, value_name = "FILE")]
    pub nonce_filename: Option<PathBuf>,

    /// Vault role to log in as
    #[arg(long, default_value = vault::DEFAULT_ROLE)]
    pub role: String,

    /// Mount path of Vault's EC2 auth method
    #[arg(long, default_value = vault::DEFAULT_AUTH_PATH)]
    pub auth_path: String,

    /// Where to fetch the PKCS7 instance identity document
    #[arg(long, value_name = "URL", default_value = vault::DEFAULT_METADATA_URL)]
    pub metadata_url: String,
}

impl BootstrapArgs {
    /// Our login settings.
    pub fn bootstrap_config(&self) -> Result<BootstrapConfig> {
        let nonce_filename = self
            .nonce_filename
            .as_ref()
            .ok_or(Error::NoNonceFilename)?;
        let mut config = BootstrapConfig::new(nonce_filename)?;
        config.role = self.role.clone();
        config.auth_path = self.auth_path.trim_matches('/').to_owned();
        config.metadata_url = self.metadata_url.parse()?;
        Ok(config)
    }
}

/// Rewrite `-secrets x` and `-nonce-filename=y` as `--secrets x` and
/// `--nonce-filename=y`, so existing invocations keep working.
pub fn normalize_legacy_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(|arg| {
            let arg = arg.into();
            match arg.to_str() {
                Some(s) if is_legacy_flag(s) => OsString::from(format!("-{}", s)),
                _ => arg,
            }
        })
        .collect()
}

fn is_legacy_flag(arg: &str) -> bool {
    match arg.strip_prefix('-') {
        Some(rest) if !rest.starts_with('-') => {
            let name = rest.split('=').next().unwrap_or(rest);
            LEGACY_FLAGS.contains(&name)
        }
        _ => false,
    }
}

/// Log to stderr, so that stdout can be passed straight to `eval`. Set
/// `RUST_LOG=debug` to see what's happening.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Fetch secrets using the ambient Vault token and render our exports.
pub async fn run_reader(args: &ReaderArgs, env: &dyn Environment) -> Result<Vec<ExportLine>> {
    let config = args.export.config(ExportMode::SkipIfSet)?;
    let mut client = Client::new(&args.export.vault_addr)?;
    if let Err(err) = client.load_default_token() {
        // A local agent may be handling authentication for us.
        warn!("{}, continuing without a token", err);
    }
    crate::run(&client, &config, env).await
}

/// Log in with our instance identity, then fetch secrets and render our
/// exports.
pub async fn run_bootstrapper(args: &BootstrapArgs) -> Result<Vec<ExportLine>> {
    let config = args.export.config(ExportMode::Always)?;
    let bootstrap = args.bootstrap_config()?;
    let mut client = Client::new(&args.export.vault_addr)?;
    vault::bootstrap(&mut client, &bootstrap).await?;
    crate::run(&client, &config, &ProcessEnvironment).await
}
