//! `fieldsync` - CLI for the field data sync engine
//!
//! This binary provides the command-line interface for inspecting the local
//! store, saving records and pushing them to the remote document store.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;

use fieldsync::cli::{
    Cli, Command, ConfigCommand, DeleteCommand, ListCommand, OutputFormat, RecordKindArg,
    SaveCommand,
};
use fieldsync::{init_logging, Collection, Config, Document, Payload, SyncEngine, TypeTag};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Execute the command
    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        command => {
            let engine = SyncEngine::open(&config).context("failed to open sync engine")?;
            let result = handle_engine(&config, &engine, command).await;
            engine.shutdown();
            result
        }
    }
}

async fn handle_engine(
    config: &Config,
    engine: &SyncEngine,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Status(status_cmd) => handle_status(engine, status_cmd.json).await,
        Command::Connect => {
            if engine.connect().await {
                println!("Remote store reachable.");
            } else {
                println!("Remote store unreachable, working offline.");
            }
            Ok(())
        }
        Command::Sync => handle_sync(engine).await,
        Command::List(list_cmd) => handle_list(engine, &list_cmd),
        Command::Save(save_cmd) => handle_save(engine, &save_cmd).await,
        Command::Delete(delete_cmd) => handle_delete(engine, &delete_cmd).await,
        Command::Reset(reset_cmd) => {
            if reset_cmd.yes {
                engine.clear_all_data().await?;
                println!("All local data removed.");
            } else {
                println!("This will delete every locally stored record, synced or not.");
                println!("Use --yes to confirm.");
            }
            Ok(())
        }
        Command::Config(config_cmd) => handle_config(config, config_cmd),
    }
}

async fn handle_status(engine: &SyncEngine, json: bool) -> anyhow::Result<()> {
    let status = engine.init().await;
    let pending = engine.unsynced_count();
    let stats = engine.stats().context("failed to read the local store")?;

    if json {
        let status = serde_json::json!({
            "isOnline": status.is_online,
            "syncActive": status.sync_active,
            "pending": pending,
            "stored": {
                "distributions": stats.distributions,
                "gpsPhotos": stats.gps_photos,
            },
            "database": engine.database_path(),
            "databaseBytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("fieldsync status");
        println!("----------------");
        println!(
            "Remote:        {}",
            if status.is_online { "online" } else { "offline" }
        );
        println!(
            "Stored:        {} distributions, {} GPS photos",
            stats.distributions, stats.gps_photos
        );
        println!(
            "Pending:       {} distributions, {} GPS photos",
            pending.distributions, pending.gps_photos
        );
        println!(
            "Database:      {} ({} bytes)",
            engine.database_path().display(),
            stats.db_size_bytes
        );
    }
    Ok(())
}

async fn handle_sync(engine: &SyncEngine) -> anyhow::Result<()> {
    match engine.manual_sync().await {
        Ok(report) => {
            println!(
                "Synced {} of {} pending documents.",
                report.synced_count, report.total_unsynced
            );
            let failed = report.failed_count();
            if failed > 0 {
                bail!(
                    "{failed} documents were not accepted and stay on this device; run sync again later"
                );
            }
            Ok(())
        }
        Err(e) if e.is_offline_sync_requested() => {
            bail!("cannot sync: the remote store is unreachable, records stay on this device")
        }
        Err(e) => Err(e.into()),
    }
}

fn handle_list(engine: &SyncEngine, cmd: &ListCommand) -> anyhow::Result<()> {
    let docs = match (Collection::from(cmd.collection), cmd.type_tag) {
        (Collection::Distributions, Some(tag)) => engine.get_distributions_by_type(tag.into()),
        (Collection::Distributions, None) => engine.get_all_distributions(),
        (Collection::GpsPhotos, _) => engine.get_all_gps_photos(),
    };

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&docs)?),
        OutputFormat::Plain => {
            for doc in &docs {
                println!("{}\t{}\t{}", doc.id(), sync_label(doc), summary(doc));
            }
        }
        OutputFormat::Table => {
            println!(
                "{:<40} {:<10} {:<20} {:<8} SUMMARY",
                "ID", "TYPE", "CREATED", "SYNCED"
            );
            for doc in &docs {
                println!(
                    "{:<40} {:<10} {:<20} {:<8} {}",
                    doc.id(),
                    doc.type_tag(),
                    doc.created_at().format("%Y-%m-%d %H:%M:%S"),
                    sync_label(doc),
                    summary(doc)
                );
            }
            println!();
            println!("{} documents", docs.len());
        }
    }
    Ok(())
}

async fn handle_save(engine: &SyncEngine, cmd: &SaveCommand) -> anyhow::Result<()> {
    let payload = read_payload(&cmd.file, cmd.kind)?;
    let receipt = engine.save(payload).await?;
    println!("Saved {} (rev {})", receipt.id, receipt.rev);
    Ok(())
}

async fn handle_delete(engine: &SyncEngine, cmd: &DeleteCommand) -> anyhow::Result<()> {
    let receipt = engine
        .delete_document(cmd.collection.into(), &cmd.id)
        .await?;
    if receipt.removed {
        println!("Deleted {}", cmd.id);
    } else {
        println!("No document with id {}", cmd.id);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                let mut shown = config.clone();
                if shown.remote.password.is_some() {
                    shown.remote.password = Some("********".to_string());
                }
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Remote]");
                println!("  Base URL:           {}", config.remote.base_url);
                println!(
                    "  Username:           {}",
                    config.remote.username.as_deref().unwrap_or("(none)")
                );
                println!("  Distributions:      {}", config.remote.distributions_db);
                println!("  GPS photos:         {}", config.remote.gps_photos_db);
                println!("  Probe timeout (s):  {}", config.remote.probe_timeout_secs);
                println!("  Push timeout (s):   {}", config.remote.request_timeout_secs);
                println!("  Push mode:          {:?}", config.remote.push_mode);
                println!();
                println!("[Events]");
                println!("  Channel capacity:   {}", config.events.channel_capacity);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path.clone()))
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

fn read_payload(path: &Path, kind: RecordKindArg) -> anyhow::Result<Payload> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let invalid = || format!("{} is not a valid {} record", path.display(), TypeTag::from(kind));
    let payload = match kind {
        RecordKindArg::Milda => Payload::Milda(serde_json::from_str(&raw).with_context(invalid)?),
        RecordKindArg::Medicine => {
            Payload::Medicine(serde_json::from_str(&raw).with_context(invalid)?)
        }
        RecordKindArg::GpsPhoto => {
            Payload::GpsPhoto(serde_json::from_str(&raw).with_context(invalid)?)
        }
    };
    Ok(payload)
}

fn sync_label(doc: &Document) -> &'static str {
    if doc.is_synced() {
        "yes"
    } else {
        "no"
    }
}

fn summary(doc: &Document) -> String {
    match doc.payload() {
        Payload::Milda(milda) => format!("{} ({} nets)", milda.household_head, milda.net_count),
        Payload::Medicine(medicine) => format!(
            "{} ({} x {})",
            medicine.household_head, medicine.quantity, medicine.medicine_type
        ),
        Payload::GpsPhoto(photo) => format!(
            "{:.5}, {:.5}",
            photo.location.latitude, photo.location.longitude
        ),
    }
}
