mod config;
mod graphql;
mod http;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use crm::{
    CrmServices, Dashboard, NotificationFeed, Report, ReportRange, TracingNotifier, seed_demo,
};
use entity::{RecordId, Stage};
use platform_obs::{ObsConfig, init_tracing};
use platform_store::{RecordStore, StoreBackend, connect};
use tracing::info;

use crate::{
    config::AppConfig,
    graphql::GraphqlData,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "crm-server", version, about = "CRM pipeline server and tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Populate an empty store with demo records.
    Seed,
    /// Print the pipeline board grouped by stage.
    Board {
        #[arg(long, value_delimiter = ',', help = "Columns to show, e.g. Lead,Closed")]
        stages: Vec<Stage>,
    },
    /// Move a deal to another stage.
    #[command(name = "move-deal")]
    MoveDeal {
        #[arg(long)]
        id: RecordId,
        #[arg(long, help = "Lead, Qualified, Proposal, Negotiation or Closed")]
        stage: String,
    },
    /// Print dashboard statistics as JSON.
    Dashboard,
    /// Print a report as JSON.
    Report {
        #[arg(long, default_value = "30", help = "30, 60, 90 or year")]
        range: ReportRange,
    },
    /// Print the GraphQL schema snapshot.
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Destination file path")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

impl From<ServeCommand> for ServeConfig {
    fn from(value: ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(match cli.command {
        Command::Serve(_) => ObsConfig::server(),
        _ => ObsConfig::cli(),
    })?;
    let app_config = Arc::new(AppConfig::load()?);
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, app_config).await,
        Command::Seed => run_seed(&app_config).await,
        Command::Board { stages } => print_board(&app_config, stages).await,
        Command::MoveDeal { id, stage } => move_deal(&app_config, id, &stage).await,
        Command::Dashboard => print_dashboard(&app_config).await,
        Command::Report { range } => print_report(&app_config, range).await,
        Command::SchemaPrint { output } => schema_print(output),
    }
}

/// Connects to the configured store, seeding the in-memory backend when asked.
async fn open_store(config: &AppConfig) -> Result<Arc<dyn RecordStore>> {
    let store = connect(&config.store).context("failed to open record store")?;
    if config.store.backend == StoreBackend::Memory && config.store.seed_demo {
        seed_demo(store.as_ref(), Utc::now())
            .await
            .context("failed to seed demo records")?;
    }
    Ok(store)
}

async fn cli_services(config: &AppConfig) -> Result<CrmServices> {
    let store = open_store(config).await?;
    Ok(CrmServices::new(store, Arc::new(TracingNotifier)))
}

async fn run_seed(config: &AppConfig) -> Result<()> {
    let store = connect(&config.store).context("failed to open record store")?;
    let summary = seed_demo(store.as_ref(), Utc::now()).await?;
    if summary.is_empty() {
        info!("store already holds contacts; nothing seeded");
    }
    Ok(())
}

async fn print_board(config: &AppConfig, stages: Vec<Stage>) -> Result<()> {
    let services = cli_services(config).await?;
    let mut board = services.board().await?;
    if !stages.is_empty() {
        board = board.with_stages(stages);
    }
    let buckets = board.buckets();
    for column in &buckets.columns {
        println!(
            "{:<12} {:>3} deals  {}",
            column.stage,
            column.deals.len(),
            column.total().format_usd()
        );
        for deal in &column.deals {
            println!("    #{:<4} {} ({})", deal.id, deal.title, deal.amount().format_usd());
        }
    }
    for deal in &buckets.unmatched {
        println!(
            "{:<12}       #{} {} has unrecognized stage {:?}",
            "-",
            deal.id,
            deal.title,
            deal.stage.as_str()
        );
    }
    println!("Total pipeline value: {}", board.total_value().format_usd());
    Ok(())
}

async fn move_deal(config: &AppConfig, id: RecordId, stage: &str) -> Result<()> {
    let services = cli_services(config).await?;
    let deal = services.move_deal(id, stage).await?;
    println!("{}", serde_json::to_string_pretty(&deal)?);
    Ok(())
}

async fn print_dashboard(config: &AppConfig) -> Result<()> {
    let services = cli_services(config).await?;
    let workspace = services.load_workspace().await?;
    let dashboard = Dashboard::compute(&workspace, Utc::now().date_naive());
    println!("{}", serde_json::to_string_pretty(&dashboard)?);
    Ok(())
}

async fn print_report(config: &AppConfig, range: ReportRange) -> Result<()> {
    let services = cli_services(config).await?;
    let workspace = services.load_workspace().await?;
    let report = Report::compute(&workspace, range, Utc::now());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let store = Arc::new(platform_store::MemoryRecordStore::new());
    let schema = graphql::build_schema(GraphqlData::new(store, NotificationFeed::shared(1)));
    let sdl = schema.sdl();
    match path {
        Some(target) => {
            std::fs::write(&target, sdl)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!(path = %target.display(), "schema snapshot written");
        }
        None => print!("{sdl}"),
    }
    Ok(())
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let store = open_store(&config).await?;
    let feed = NotificationFeed::shared(config.notification_buffer);
    let graphql_data = GraphqlData::new(store, feed);
    let services = graphql_data.services.clone();
    let schema = graphql::build_schema(graphql_data);
    let state = AppState {
        schema,
        services,
        config: config.clone(),
    };
    http::serve(cmd.into(), state).await
}
