/// Cleanup Binary - removes items that are just menu-button labels
///
/// Older clients saved a pressed keyboard button as a regular message, so
/// rows like "📊 Stats" ended up in the inbox. This deletes every idea and
/// task whose content is exactly such a label.
///
/// Usage:
///   cleanup [--db-path <path>] [--dry-run]
///
/// Options:
///   --db-path: Path to SQLite database (defaults to DATABASE_PATH, then data/ideas.db)
///   --dry-run: Only report what would be deleted
use anyhow::{Context, Result};
use clap::Parser;
use idea_inbox::{menu_label_variants, telemetry, Config, Database};
use idea_inbox_schemas::ItemKind;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cleanup")]
#[command(about = "Delete ideas and tasks that only contain a menu-button label")]
struct Args {
    /// Path to SQLite database file
    #[arg(long, short)]
    db_path: Option<PathBuf>,

    /// Report counts without deleting anything
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = Config::from_env()?;
    let _log_guard = telemetry::init_tracing(&config.log_level, None)?;

    info!("Idea Inbox - Cleanup Tool v{}", env!("CARGO_PKG_VERSION"));

    let db_path = args.db_path.unwrap_or(config.database_path.clone());
    info!("Database: {}", db_path.display());

    let db = Database::new(&db_path, config.reporting_zone())
        .with_context(|| format!("opening database {}", db_path.display()))?;

    let labels = menu_label_variants();
    let mut total = 0;
    for kind in ItemKind::ALL {
        let removed = if args.dry_run {
            db.count_items_with_content(kind, &labels)? as usize
        } else {
            db.delete_items_with_content(kind, &labels)?
        };
        info!("{}: {} label row(s)", kind.table(), removed);
        total += removed;
    }

    if args.dry_run {
        info!("Dry run: {} row(s) would be deleted", total);
    } else {
        info!("Deleted {} row(s)", total);
    }

    for kind in ItemKind::ALL {
        info!("Remaining {}: {}", kind.table(), db.count_items(kind)?);
    }

    Ok(())
}
