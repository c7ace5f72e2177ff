//! plans: command line client for the plans service.
//!
//! Usage:
//!   plans list-plans canonical
//!   plans show-plan canonical/landscape-default --content
//!   plans release-plan canonical/landscape-default/3
//!
//! The service URL comes from `--url`, then `PLANS_URL` (or the older
//! `OB_URL`), then the built-in default. A `.env` file is honoured.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use plans_client::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    cli::init_tracing();

    let args = Cli::parse();
    let result = match cli::connect(args.url.as_deref()) {
        Ok(client) => cli::run(args.command, args.format, &client, &mut io::stdout()).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR {err}");
            ExitCode::from(cli::exit_code(&err))
        }
    }
}
