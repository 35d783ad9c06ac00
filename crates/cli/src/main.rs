use anyhow::Context;
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use intake_core::config::{data_dir_from_env_value, signature_base_url_from_env_value};
use intake_core::{BundleManager, CoreConfig, IntakeService, RecordId};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "intake")]
#[command(about = "Intake form schema and record tooling")]
struct Cli {
    /// Data directory (overrides INTAKE_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Public URL prefix for signature images (overrides INTAKE_SIGNATURE_BASE_URL)
    #[arg(long, global = true)]
    signature_base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default schema
    Seed {
        /// Overwrite an existing schema
        #[arg(long)]
        force: bool,
    },
    /// List sections
    Sections,
    /// List core and custom fields
    Fields {
        /// Include disabled fields
        #[arg(long)]
        all: bool,
    },
    /// Print the public form, or a record's edit form, as JSON
    Form {
        /// Record to pre-fill from
        #[arg(long)]
        record: Option<RecordId>,
    },
    /// Export the schema as a config bundle
    Export {
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import a config bundle, backing up the current schema first
    Import {
        /// Bundle JSON file
        file: PathBuf,
    },
    /// Restore a backup by timestamp
    Restore {
        /// Backup timestamp (unix seconds)
        timestamp: i64,
    },
    /// List config backups
    Backups,
    /// List recent records
    Records {
        /// Maximum number of records
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one record as JSON
    Show {
        /// Record id
        id: RecordId,
    },
}

/// Entry point for the `intake` tool.
///
/// # Environment Variables
/// - `INTAKE_DATA_DIR`: root of all persisted state (default: "intake_data")
/// - `INTAKE_SIGNATURE_BASE_URL`: URL prefix for stored signatures
///   (default: "http://localhost/intake-files")
/// - `RUST_LOG`: log filter, on top of `intake=info`
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("intake=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'intake --help' for commands");
        return Ok(());
    };

    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| data_dir_from_env_value(std::env::var("INTAKE_DATA_DIR").ok()));
    let base_url = cli.signature_base_url.unwrap_or_else(|| {
        signature_base_url_from_env_value(std::env::var("INTAKE_SIGNATURE_BASE_URL").ok())
    });
    let cfg = Arc::new(CoreConfig::new(data_dir, base_url)?);
    tracing::debug!(data_dir = %cfg.data_dir().display(), "configuration resolved");

    let service = IntakeService::from_config(cfg.clone())?;
    let bundles = BundleManager::from_config(cfg);

    match command {
        Commands::Seed { force } => {
            if service.seed_defaults(!force)? {
                println!("Default schema written.");
            } else {
                println!("Schema already present; use --force to overwrite.");
            }
        }
        Commands::Sections => {
            for section in service.schema()?.sections(false) {
                println!(
                    "{:>4}  {:<12} {:<8} {}",
                    section.order,
                    section.id.as_str(),
                    if section.enabled { "on" } else { "off" },
                    section.title
                );
            }
        }
        Commands::Fields { all } => {
            let schema = service.schema()?;
            for field in schema.core_fields(!all) {
                let mut flags = Vec::new();
                if field.required {
                    flags.push("required");
                }
                if !field.enabled {
                    flags.push("disabled");
                }
                if field.lock_enabled || field.lock_required {
                    flags.push("locked");
                }
                println!(
                    "core    {:<10} {:>4}  {:<24} {:<14} {} [{}]",
                    field.section.as_str(),
                    field.order,
                    field.key.as_str(),
                    field.field_type.as_str(),
                    field.label,
                    flags.join(", ")
                );
            }
            for field in schema.custom_fields(!all) {
                println!(
                    "custom  {:<10} {:>4}  {:<24} {:<14} {}{}",
                    field.section,
                    field.order,
                    field.key.as_str(),
                    field.field_type.as_str(),
                    field.label,
                    if field.required { " [required]" } else { "" }
                );
            }
        }
        Commands::Form { record } => {
            let form = match record {
                Some(id) => service.render_admin_edit(id)?,
                None => service.render_public_form()?,
            };
            println!("{}", serde_json::to_string_pretty(&form)?);
        }
        Commands::Export { out } => {
            let json = bundles.export_json()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Exported config to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            bundles.import_json(&raw)?;
            println!("Imported config from {}", file.display());
        }
        Commands::Restore { timestamp } => {
            bundles.restore_bundle(timestamp)?;
            println!("Restored backup {timestamp}");
        }
        Commands::Backups => {
            let backups = bundles.list_backups()?;
            if backups.is_empty() {
                println!("No backups yet.");
            }
            for backup in backups {
                let taken = Utc
                    .timestamp_opt(backup.timestamp, 0)
                    .single()
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "?".into());
                println!(
                    "{}  {}  {} bytes  ({} sections, {} core, {} custom)",
                    backup.timestamp,
                    taken,
                    backup.size_bytes,
                    backup.sections,
                    backup.core,
                    backup.custom
                );
            }
        }
        Commands::Records { limit } => {
            let records = service.list_records(limit)?;
            if records.is_empty() {
                println!("No submissions yet.");
            }
            for record in records {
                println!(
                    "{:>6}  {}  {:<24} {:<10} {:<16} {:<28} {}",
                    record.id.value(),
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.full_name.unwrap_or_default(),
                    record.dob.map(|d| d.to_string()).unwrap_or_default(),
                    record.phone.unwrap_or_default(),
                    record.email.unwrap_or_default(),
                    record.therapy_selection.unwrap_or_default()
                );
            }
        }
        Commands::Show { id } => {
            let record = service.get_record(id)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}
