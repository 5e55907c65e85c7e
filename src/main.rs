use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use cardquery::card_catalog::CatalogConfig;
use cardquery::config::CompilerConfig;
use cardquery::query_runner::{ClickHouseExecutor, FormatOptions, QueryRunner};
use cardquery::query_tree::Node;
use cardquery::sql_generator::generate_sql;
use cardquery::sql_plan::PlanQueryCompiler;
use clap::Parser;

/// CardQuery - compile a cross-project card query to ClickHouse SQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML file describing projects, scopes and users
    #[arg(long)]
    catalog: PathBuf,

    /// Name of the plan whose projects the query spans
    #[arg(long)]
    scope: String,

    /// JSON file holding the parsed query tree
    #[arg(long)]
    query: PathBuf,

    /// Optional YAML compiler configuration (defaults, then CARDQUERY_* env vars)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the SQL on ClickHouse (CLICKHOUSE_* env vars) and print the rows
    #[arg(long)]
    execute: bool,

    /// With --execute, print a flat list of values instead of rows
    #[arg(long, requires = "execute")]
    single: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => CompilerConfig::from_yaml_file(path),
        None => CompilerConfig::from_env(),
    }
    .context("Configuration error")?;

    let catalog = CatalogConfig::from_yaml_file(&cli.catalog)
        .and_then(|catalog_config| catalog_config.to_catalog())
        .with_context(|| format!("Failed to load catalog {}", cli.catalog.display()))?;
    let catalog = Arc::new(catalog);

    let scope = catalog
        .scope(&cli.scope)
        .cloned()
        .ok_or_else(|| anyhow!("Unknown scope '{}'", cli.scope))?;

    let tree_json = std::fs::read_to_string(&cli.query)
        .with_context(|| format!("Failed to read query {}", cli.query.display()))?;
    let tree: Node = serde_json::from_str(&tree_json).context("Query tree is not valid JSON")?;

    let compiler = PlanQueryCompiler::new(catalog.as_ref(), &config);
    let compiled = compiler.compile(&scope, &tree)?;
    log::info!(
        "Compiled query over scope '{}' ({} output column(s))",
        scope.name,
        compiled.columns.len()
    );

    if !cli.execute {
        println!("{}", generate_sql(&compiled));
        return Ok(());
    }

    let executor = ClickHouseExecutor::from_env()?;
    let runner = QueryRunner::new(
        Arc::new(executor),
        catalog.clone(),
        FormatOptions::from(&config),
    );
    let output = if cli.single {
        serde_json::to_string_pretty(&runner.single_values(&compiled).await?)?
    } else {
        serde_json::to_string_pretty(&runner.values(&compiled).await?)?
    };
    println!("{}", output);
    Ok(())
}
