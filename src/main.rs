use anyhow::{bail, Context, Result};
use campaign_kit::{
    logging, BalanceClient, CampaignForm, CampaignStatus, CampaignStore, CampaignUpdateForm, Config,
};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

/// Campaign records and publisher balance checks.
#[derive(Parser, Debug)]
#[command(name = "campaign-kit", version, about)]
struct Cli {
    /// Config file (defaults to the platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage campaign records
    #[command(subcommand)]
    Campaign(CampaignCommands),
    /// Query the publisher balance service
    #[command(subcommand)]
    Balance(BalanceCommands),
}

#[derive(Subcommand, Debug)]
enum CampaignCommands {
    /// Create a campaign
    Create {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// draft, active, paused or completed (default: draft)
        #[arg(long)]
        status: Option<CampaignStatus>,
        /// JSON object
        #[arg(long, value_parser = parse_json_object)]
        data: Option<JsonObject>,
        /// JSON object
        #[arg(long, value_parser = parse_json_object)]
        meta: Option<JsonObject>,
    },
    /// List campaigns, most recently updated first
    List {
        /// Only campaigns owned by this user
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show one campaign
    Get { id: String },
    /// Change only the given fields
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<CampaignStatus>,
        #[arg(long, value_parser = parse_json_object)]
        data: Option<JsonObject>,
        #[arg(long, value_parser = parse_json_object)]
        meta: Option<JsonObject>,
    },
    /// Delete a campaign
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum BalanceCommands {
    /// Check whether the balance covers COST
    Check {
        cost: i64,
        /// Fail on service errors instead of printing the empty fallback
        #[arg(long)]
        strict: bool,
    },
}

type JsonObject = serde_json::Map<String, serde_json::Value>;

fn parse_json_object(raw: &str) -> Result<JsonObject, String> {
    match serde_json::from_str(raw).map_err(|e| e.to_string())? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err("expected a JSON object".to_string()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Campaign(command) => run_campaign(&config, command),
        Commands::Balance(command) => run_balance(&config, command),
    }
}

fn run_campaign(config: &Config, command: CampaignCommands) -> Result<()> {
    let store = CampaignStore::open(&config.store).with_context(|| {
        format!(
            "Failed to open campaign store at {}",
            config.store.resolved_db_path().display()
        )
    })?;

    match command {
        CampaignCommands::Create {
            owner,
            name,
            description,
            status,
            data,
            meta,
        } => {
            let form = CampaignForm {
                name,
                description,
                status,
                data,
                meta,
            };
            print_json(&store.insert_new_campaign(&owner, form)?)
        }
        CampaignCommands::List { owner } => {
            let campaigns = match owner {
                Some(owner) => store.get_campaigns_by_user_id(&owner)?,
                None => store.get_campaigns()?,
            };
            print_json(&campaigns)
        }
        CampaignCommands::Get { id } => print_json(&store.get_campaign_by_id(&id)?),
        CampaignCommands::Update {
            id,
            name,
            description,
            status,
            data,
            meta,
        } => {
            let form = CampaignUpdateForm {
                name,
                description,
                status,
                data,
                meta,
            };
            print_json(&store.update_campaign_by_id(&id, form)?)
        }
        CampaignCommands::Delete { id } => {
            let deleted = store.delete_campaign_by_id(&id)?;
            print_json(&serde_json::json!({ "id": id, "deleted": deleted }))
        }
    }
}

fn run_balance(config: &Config, command: BalanceCommands) -> Result<()> {
    let client = BalanceClient::new(config.balance.clone())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    match command {
        BalanceCommands::Check { cost, strict } => {
            if cost <= 0 {
                bail!("cost must be a positive integer");
            }
            tracing::debug!(base_url = %client.config().base_url, cost, strict, "Checking balance");
            let check = if strict {
                runtime.block_on(client.try_check_balance(cost))?
            } else {
                runtime.block_on(client.check_balance(cost))
            };
            print_json(&check)
        }
    }
}
