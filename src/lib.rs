//! Log into Hashicorp's Vault and print secrets as shell `export`
//! statements.
//!
//! Secrets are fetched first, then each export of the form
//! `NAME=secret/path.field` is resolved against them:
//!
//! ```
//! use std::collections::BTreeMap;
//! use vault_exports::export::{render_export, ExportMode, ExportSpec};
//! use vault_exports::secret::{Secret, SecretCollection};
//!
//! let mut db = Secret::new();
//! db.insert("user".to_owned(), "alice".into());
//! let mut secrets = SecretCollection::new();
//! secrets.insert("db", db);
//!
//! let spec: ExportSpec = "DB_USER=db.user".parse().unwrap();
//! let env: BTreeMap<String, String> = BTreeMap::new();
//! let line = render_export(&spec, &secrets, ExportMode::Always, &env).unwrap();
//! assert_eq!(line.to_string(), "export DB_USER=alice");
//! ```

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate tracing;

pub mod backend;
pub mod cli;
pub mod config;
pub mod envvar;
pub mod errors;
pub mod export;
pub mod secret;
pub mod vault;

pub use crate::backend::SecretSource;
pub use crate::config::Config;
pub use crate::errors::{Error, Result};
pub use crate::export::{ExportLine, ExportMode, ExportSpec};

use crate::envvar::Environment;

/// Fetch every secret in `config`, then render its exports. Nothing is
/// rendered if any secret can't be read.
pub async fn run<S>(source: &S, config: &Config, env: &dyn Environment) -> Result<Vec<ExportLine>>
where
    S: SecretSource + ?Sized,
{
    let secrets = secret::fetch_secrets(source, &config.secrets).await?;
    export::render_exports(&config.exports, &secrets, config.mode, env)
}
