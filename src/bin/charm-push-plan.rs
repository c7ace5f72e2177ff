//! charm-push-plan: uploads a plan definition to the plans service.
//!
//!   charm-push-plan plan.yaml canonical/default

use std::io;
use std::process::ExitCode;

use clap::Parser;
use plans_client::cli::{self, PushArgs};

#[derive(Parser)]
#[command(name = "charm-push-plan")]
#[command(about = "Push a new plan", long_about = None)]
struct PushPlan {
    #[command(flatten)]
    args: PushArgs,

    /// Plans service URL; overrides PLANS_URL
    #[arg(short, long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    cli::init_tracing();

    let push = PushPlan::parse();
    let result = match cli::connect(push.url.as_deref()) {
        Ok(client) => cli::push_plan(&push.args, &client, &mut io::stdout()).await,
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
