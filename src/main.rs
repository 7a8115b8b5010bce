//! DataVeil - Privacy-preserving tabular data extraction and export
//!
//! Fetches tabular data from registered sources, narrows it through a
//! declarative rule set, classifies persons for inclusion, and exports
//! pseudonymized row sets.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use dataveil::{
    config::{DataVeilConfig, SourceConfig},
    export::{export_filtered, ExportOptions},
    filter::{PersonLedger, Rule},
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dataveil")]
#[command(author = "DataVeil Team")]
#[command(version)]
#[command(about = "Privacy-preserving tabular data extraction and export")]
struct Cli {
    /// Base directory holding the .dataveil workspace
    #[arg(short, long, env = "DATAVEIL_DIR")]
    dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the workspace status
    Status,

    /// Manage data sources
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },

    /// List available tables and columns after filtering
    List,

    /// Show or set the privacy mode (default: pseudonymous)
    Privacy {
        /// Fetch personal identifiers
        #[arg(long, conflicts_with = "pseudonymous")]
        personal: bool,

        /// Pseudonymize person identifiers upstream
        #[arg(long)]
        pseudonymous: bool,
    },

    /// Manage rules excluding tables, columns, or persons at fetch
    Exclude {
        #[command(subcommand)]
        action: ExcludeAction,
    },

    /// Fetch filtered rows from the sources into the workspace
    Fetch,

    /// Export anonymized data
    Anonymize {
        /// Output directory (default: .dataveil/export)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SourceAction {
    /// Register a source
    Add {
        /// Unique source id
        id: String,

        /// Directory the file-backed source reads from
        path: PathBuf,

        /// Display name (defaults to the id)
        #[arg(long)]
        name: Option<String>,
    },
    /// List registered sources
    List,
    /// Remove a registered source
    Remove { id: String },
}

#[derive(Subcommand)]
enum ExcludeAction {
    /// Add a rule
    Add {
        /// Source id to match exactly
        #[arg(long)]
        source: Option<String>,

        /// Table name substring to match
        #[arg(long)]
        table: Option<String>,

        /// Match the table field against the table id instead
        #[arg(long)]
        table_by_id: bool,

        /// Column key substring to match
        #[arg(long)]
        column: Option<String>,

        /// Row value: classifies persons instead of reshaping the hierarchy
        #[arg(long)]
        value: Option<String>,

        /// Reverse the rule (inclusion, or inverted person match)
        #[arg(long)]
        reverse: bool,
    },
    /// List stored rules
    List,
    /// Remove all stored rules
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("dataveil={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Status => run_status(&base).await?,
        Commands::Source { action } => run_source(&base, action)?,
        Commands::List => run_list(&base).await?,
        Commands::Privacy {
            personal,
            pseudonymous,
        } => run_privacy(&base, personal, pseudonymous)?,
        Commands::Exclude { action } => run_exclude(&base, action)?,
        Commands::Fetch => run_fetch(&base).await?,
        Commands::Anonymize { out } => run_anonymize(&base, out).await?,
    }

    Ok(())
}

/// Load the configuration or fail with a usage hint
fn require_config(base: &std::path::Path) -> Result<DataVeilConfig> {
    match DataVeilConfig::load(base)? {
        Some(config) => Ok(config),
        None => bail!(
            "the working directory has no configuration ({}); use 'dataveil source add' first",
            dataveil::config::WORKSPACE_DIR
        ),
    }
}

/// Require at least one registered source
fn require_sources(config: &DataVeilConfig) -> Result<()> {
    if config.sources.is_empty() {
        bail!("no sources configured; use 'dataveil source add' first");
    }
    Ok(())
}

fn workspace_ledger(base: &std::path::Path) -> PersonLedger {
    PersonLedger::new(DataVeilConfig::workspace_dir(base))
}

async fn run_status(base: &std::path::Path) -> Result<()> {
    let Some(config) = DataVeilConfig::load(base)? else {
        println!("No workspace configured in {}", base.display());
        return Ok(());
    };
    let engine = config.build_engine();

    println!("Workspace: {}", DataVeilConfig::workspace_dir(base).display());
    println!(
        "Privacy:   {}",
        if config.privacy.include_personal {
            "personal"
        } else {
            "pseudonymous"
        }
    );
    println!("Sources:   {}", config.sources.len());
    println!(
        "Rules:     {} inclusion, {} exclusion, {} person",
        engine.inclusions().len(),
        engine.exclusions().len(),
        engine.person_rules().len()
    );

    match workspace_ledger(base).status().await? {
        Some(status) => println!(
            "Persons:   {} selected, {} included ({}%)",
            status.total, status.included, status.percent
        ),
        None => println!("Persons:   no selection recorded"),
    }
    Ok(())
}

fn run_source(base: &std::path::Path, action: SourceAction) -> Result<()> {
    match action {
        SourceAction::Add { id, path, name } => {
            let mut config = DataVeilConfig::load(base)?.unwrap_or_default();
            if config.find_source(&id).is_some() {
                bail!("source '{}' is already registered", id);
            }
            let name = name.unwrap_or_else(|| id.clone());
            config.sources.push(SourceConfig { id: id.clone(), name, path });
            config.save(base)?;
            println!("Registered source '{}'", id);
        }
        SourceAction::List => {
            let config = require_config(base)?;
            if config.sources.is_empty() {
                println!("No sources registered");
            }
            for source in &config.sources {
                println!("{:<16}{:<24}{}", source.id, source.name, source.path.display());
            }
        }
        SourceAction::Remove { id } => {
            let mut config = require_config(base)?;
            let before = config.sources.len();
            config.sources.retain(|s| s.id != id);
            if config.sources.len() == before {
                bail!("source '{}' is not registered", id);
            }
            config.save(base)?;
            println!("Removed source '{}'", id);
        }
    }
    Ok(())
}

async fn run_list(base: &std::path::Path) -> Result<()> {
    let config = require_config(base)?;
    require_sources(&config)?;

    let registry = config.api_registry();
    let sources = config.discover_sources(&registry).await?;
    let engine = config.build_engine();

    for source in engine.filter(&sources) {
        println!("{} ({})", source.name, source.id);
        for table in &source.tables {
            println!("  [{}] {}", table.id, table.name);
            for column in &table.columns {
                println!("      {}", column.key);
            }
            for column in &table.columns_rm {
                println!("      {} (removed)", column.key);
            }
        }
    }
    Ok(())
}

fn run_privacy(base: &std::path::Path, personal: bool, pseudonymous: bool) -> Result<()> {
    let mut config = DataVeilConfig::load(base)?.unwrap_or_default();
    if personal || pseudonymous {
        config.privacy.include_personal = personal;
        config.save(base)?;
    }
    println!(
        "Privacy mode: {}",
        if config.privacy.include_personal {
            "personal"
        } else {
            "pseudonymous"
        }
    );
    Ok(())
}

fn run_exclude(base: &std::path::Path, action: ExcludeAction) -> Result<()> {
    match action {
        ExcludeAction::Add {
            source,
            table,
            table_by_id,
            column,
            value,
            reverse,
        } => {
            let mut config = require_config(base)?;
            let rule = Rule {
                source,
                table,
                table_by_id,
                column,
                value,
                reverse,
            };
            if !rule.targets_hierarchy() {
                bail!("a rule needs at least one of --source, --table, --column");
            }
            config.rules.push(rule);
            config.save(base)?;
            println!("Rule stored ({} total)", config.rules.len());
        }
        ExcludeAction::List => {
            let config = require_config(base)?;
            if config.rules.is_empty() {
                println!("No rules stored");
            }
            for (i, rule) in config.rules.iter().enumerate() {
                println!("{:>3}  {}", i, toml::to_string(rule)?.trim().replace('\n', ", "));
            }
        }
        ExcludeAction::Clear => {
            let mut config = require_config(base)?;
            let removed = config.rules.len();
            config.rules.clear();
            config.save(base)?;
            println!("Removed {} rule(s)", removed);
        }
    }
    Ok(())
}

async fn run_fetch(base: &std::path::Path) -> Result<()> {
    let config = require_config(base)?;
    require_sources(&config)?;

    let registry = config.api_registry();
    let sources = config.discover_sources(&registry).await?;
    let engine = config.build_engine();
    let ledger = workspace_ledger(base);
    let out_dir = DataVeilConfig::workspace_dir(base).join("fetch");

    let summaries = export_filtered(
        &engine,
        &sources,
        &registry,
        &ledger,
        ExportOptions {
            include_personal: config.privacy.include_personal,
            write_removed_sidecar: false,
        },
        &out_dir,
    )
    .await?;

    for summary in &summaries {
        println!(
            "{}/{}: {} row(s)",
            summary.source, summary.table, summary.rows_written
        );
    }
    println!("Fetched {} table(s) into {}", summaries.len(), out_dir.display());
    Ok(())
}

async fn run_anonymize(base: &std::path::Path, out: Option<PathBuf>) -> Result<()> {
    let config = require_config(base)?;
    require_sources(&config)?;

    let registry = config.api_registry();
    let sources = config.discover_sources(&registry).await?;
    let engine = config.build_engine();
    let ledger = workspace_ledger(base);
    let out_dir = out.unwrap_or_else(|| DataVeilConfig::workspace_dir(base).join("export"));

    let summaries = export_filtered(
        &engine,
        &sources,
        &registry,
        &ledger,
        ExportOptions {
            include_personal: false,
            write_removed_sidecar: true,
        },
        &out_dir,
    )
    .await?;

    for summary in &summaries {
        let dropped = if summary.columns_dropped.is_empty() {
            String::new()
        } else {
            format!(" ({} column(s) dropped)", summary.columns_dropped.len())
        };
        println!(
            "{}/{}: {} row(s){}",
            summary.source, summary.table, summary.rows_written, dropped
        );
    }
    println!("Exported {} table(s) to {}", summaries.len(), out_dir.display());
    Ok(())
}
