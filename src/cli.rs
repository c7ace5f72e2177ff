//! Command line front end shared by the `plans` and `charm-push-plan` binaries.
//!
//! Argument parsing is clap derive; [`run`] executes a parsed command against
//! any [`PlanClient`] and writes its output to the given writer.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::client::{HttpPlanClient, PlanClient};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::identifier::{PlanId, PlanOwner, PlanUrl};
use crate::output::{self, OutputFormat};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "plans_client=warn";

#[derive(Parser, Debug)]
#[command(name = "plans")]
#[command(about = "Manage rating plans and the charms they apply to", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Plans service URL; overrides PLANS_URL
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Tabular)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a new plan
    PushPlan(PushArgs),
    /// List plans owned by a user or group
    ListPlans { owner: String },
    /// Show plan details
    ShowPlan {
        /// owner/name or owner/name/revision
        plan_url: String,
        /// Include the plan definition
        #[arg(long)]
        content: bool,
        /// Print only the plan definition
        #[arg(long)]
        definition: bool,
    },
    /// Show all revisions of a plan
    ShowPlanRevisions { plan_url: String },
    /// Release a plan revision
    ReleasePlan {
        /// owner/name/revision
        plan_id: String,
    },
    /// Suspend a plan for some or all charms
    SuspendPlan(SuspendResumeArgs),
    /// Resume a suspended plan for some or all charms
    ResumePlan(SuspendResumeArgs),
    /// Associate a charm with a plan
    AttachPlan {
        charm_url: String,
        plan_url: String,
        /// Make this plan the charm's default
        #[arg(long)]
        default: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PushArgs {
    /// File holding the plan definition
    pub filename: PathBuf,
    /// owner/name
    pub plan_url: String,
}

#[derive(Args, Debug, Clone)]
pub struct SuspendResumeArgs {
    pub plan_url: String,
    pub charm_urls: Vec<String>,
    /// Apply to every charm the plan is attached to
    #[arg(long)]
    pub all: bool,
}

impl SuspendResumeArgs {
    fn plan_url(&self) -> Result<PlanUrl> {
        if self.all && !self.charm_urls.is_empty() {
            return Err(Error::Usage("cannot use --all and specify charm urls".to_string()));
        }
        if !self.all && self.charm_urls.is_empty() {
            return Err(Error::Usage("missing plan or charm url".to_string()));
        }
        Ok(PlanUrl::parse(&self.plan_url)?)
    }
}

/// Installs the stderr subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // A subscriber may already be installed (tests, embedding programs).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

/// Builds an HTTP client from the environment, with `url` taking precedence.
pub fn connect(url: Option<&str>) -> Result<HttpPlanClient> {
    let config = ClientConfig::from_env_with_service_url(url)?;
    debug!(?config, "plans client configuration");
    HttpPlanClient::new(&config)
}

/// Process exit status for a failed command.
pub fn exit_code(err: &Error) -> u8 {
    match err {
        Error::Usage(_) => 2,
        _ => 1,
    }
}

fn output_error(source: io::Error) -> Error {
    Error::Io {
        context: "failed to write output".to_string(),
        source,
    }
}

pub async fn run(
    command: Commands,
    format: OutputFormat,
    client: &dyn PlanClient,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Commands::PushPlan(args) => push_plan(&args, client, out).await,
        Commands::ListPlans { owner } => {
            let owner = PlanOwner::parse(&owner)?;
            let plans = client.get_plans(&owner).await?;
            output::write_plans(out, format, &plans).map_err(output_error)
        }
        Commands::ShowPlan {
            plan_url,
            content,
            definition,
        } => {
            let id = PlanId::parse_with_optional_revision(&plan_url)?;
            let details = client.get_plan_details(&id).await?;
            let written = if definition {
                output::write_definition(out, &details)
            } else {
                output::write_plan_details(out, format, &details, content)
            };
            written.map_err(output_error)
        }
        Commands::ShowPlanRevisions { plan_url } => {
            let url = PlanUrl::parse(&plan_url)?;
            let plans = client.get_plan_revisions(&url).await?;
            output::write_plans(out, format, &plans).map_err(output_error)
        }
        Commands::ReleasePlan { plan_id } => {
            let id = PlanId::parse(&plan_id)?;
            let plan = client.release(&id).await?;
            info!(plan = %plan.id, "plan released");
            output::write_released(out, &plan).map_err(output_error)
        }
        Commands::SuspendPlan(args) => {
            let url = args.plan_url()?;
            client.suspend(&url, args.all, &args.charm_urls).await
        }
        Commands::ResumePlan(args) => {
            let url = args.plan_url()?;
            client.resume(&url, args.all, &args.charm_urls).await
        }
        Commands::AttachPlan {
            charm_url,
            plan_url,
            default,
        } => {
            let url = PlanUrl::parse(&plan_url)?;
            let plans = client.get(&url).await?;
            if plans.len() != 1 {
                return Err(Error::PlanCount {
                    url: url.to_string(),
                    count: plans.len(),
                });
            }
            client.add_charm(&url, &charm_url, default).await?;
            writeln!(out, "OK").map_err(output_error)
        }
    }
}

/// Reads the definition file and uploads it as a new plan.
pub async fn push_plan(args: &PushArgs, client: &dyn PlanClient, out: &mut dyn Write) -> Result<()> {
    let definition = tokio::fs::read_to_string(&args.filename)
        .await
        .map_err(|source| Error::Io {
            context: format!(
                "could not read the rating plan from file {:?}",
                args.filename.display().to_string()
            ),
            source,
        })?;
    let url = PlanUrl::parse(&args.plan_url)?;
    let plan = client.save(&url, &definition).await?;
    let saved = if plan.id.is_empty() {
        url.to_string()
    } else {
        plan.id
    };
    info!(plan = %saved, "plan saved");
    writeln!(out, "saved as plan: {saved}").map_err(output_error)
}
