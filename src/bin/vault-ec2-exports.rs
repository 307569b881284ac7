//! Log into Vault using this EC2 instance's identity document and a nonce,
//! then print secrets as shell exports.

use clap::Parser;
use std::env;
use std::process;
use vault_exports::cli::{self, BootstrapArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    cli::init_tracing();

    let args = BootstrapArgs::parse_from(cli::normalize_legacy_flags(env::args_os()));
    match cli::run_bootstrapper(&args).await {
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
