use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use blockid::{AllocatorConfig, TableSchema};
use clap::{Parser, Subcommand};

/// Runtime configuration for the `blockid` binary.
///
/// Every option can also be supplied through the environment (or a `.env`
/// file in the working directory).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "blockid",
    version,
    about = "Issue unique, monotonic ids from a SQLite-backed counter table"
)]
pub struct CliArgs {
    /// Path of the SQLite database holding the counter table.
    ///
    /// Environment variable: `BLOCKID_DATABASE`
    #[arg(long, env = "BLOCKID_DATABASE", default_value = "blockid.db")]
    pub database: PathBuf,

    /// Name of the counter table. Letters and underscores only.
    ///
    /// Environment variable: `BLOCKID_TABLE`
    #[arg(long, env = "BLOCKID_TABLE", default_value_t = String::from(blockid::DEFAULT_TABLE))]
    pub table: String,

    /// Spacing between consecutive ids of a newly created entity.
    ///
    /// Environment variable: `BLOCKID_STEP`
    #[arg(long, global = true, env = "BLOCKID_STEP", default_value_t = blockid::DEFAULT_STEP)]
    pub step: i32,

    /// Ids reserved per database top-up for a newly created entity.
    ///
    /// Environment variable: `BLOCKID_BLOCK_SIZE`
    #[arg(long, global = true, env = "BLOCKID_BLOCK_SIZE", default_value_t = blockid::DEFAULT_BLOCK_SIZE)]
    pub block_size: i64,

    /// How long to wait for another writer's lock, in milliseconds.
    ///
    /// Environment variable: `BLOCKID_BUSY_TIMEOUT_MS`
    #[arg(long, env = "BLOCKID_BUSY_TIMEOUT_MS", default_value_t = 5_000)]
    pub busy_timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the counter table if it does not exist.
    Init,
    /// Issue ids for an entity and print them one per line.
    Next {
        /// Name of the sequence.
        entity: String,
        /// Number of ids to issue.
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub database: PathBuf,
    pub busy_timeout: Duration,
    pub allocator: AllocatorConfig,
    pub command: Command,
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.step <= 0 {
            bail!("BLOCKID_STEP must be greater than 0");
        }
        if args.block_size <= 0 {
            bail!("BLOCKID_BLOCK_SIZE must be greater than 0");
        }
        if let Command::Next { count: 0, .. } = args.command {
            bail!("--count must be greater than 0");
        }

        let allocator = AllocatorConfig {
            schema: TableSchema::with_table(args.table)?,
            default_step: args.step,
            default_block_size: args.block_size,
        };

        Ok(Self {
            database: args.database,
            busy_timeout: Duration::from_millis(args.busy_timeout_ms),
            allocator,
            command: args.command,
        })
    }
}
