//! Print Vault secrets as shell exports, using the token from `VAULT_TOKEN`
//! or `~/.vault-token`.

use clap::Parser;
use std::env;
use std::process;
use vault_exports::cli::{self, ReaderArgs};
use vault_exports::envvar::ProcessEnvironment;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    cli::init_tracing();

    let args = ReaderArgs::parse_from(cli::normalize_legacy_flags(env::args_os()));
    match cli::run_reader(&args, &ProcessEnvironment).await {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(err.exit_code());
        }
    }
}
