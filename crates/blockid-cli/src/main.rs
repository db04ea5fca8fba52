mod config;
mod telemetry;

use std::io::{BufWriter, Write};

use blockid::{BlockAllocator, SqliteConnectionFactory, SqliteDialect};
use clap::Parser;
use config::{CliArgs, CliConfig, Command};
use telemetry::init_tracing;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CliConfig::try_from(args)?;

    init_tracing();

    let factory =
        SqliteConnectionFactory::new(&config.database).with_busy_timeout(config.busy_timeout);
    let allocator = BlockAllocator::with_config(factory, &SqliteDialect, config.allocator)?;

    match config.command {
        Command::Init => {
            allocator.ensure_schema()?;
            tracing::info!(
                database = %config.database.display(),
                table = allocator.config().schema.table(),
                "counter table ready"
            );
        }
        Command::Next { entity, count } => {
            let ids = allocator.next_ids(&entity, count)?;
            let window = allocator.cached_window(&entity)?;
            tracing::debug!(entity, count, ?window, "issued");

            let mut out = BufWriter::new(std::io::stdout().lock());
            for id in ids {
                writeln!(out, "{id}")?;
            }
            out.flush()?;
        }
    }
    Ok(())
}
