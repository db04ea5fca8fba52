//! Batched, database-backed ID allocation.
//!
//! Every named sequence (an *entity*) owns one durable counter row holding the
//! highest id ever reserved for it (its *ceiling*). An allocator leases a block
//! of ids above that ceiling inside one short transaction, caches the lease as
//! a [`Window`], and serves subsequent requests from memory until the window
//! runs dry.
//!
//! - No id at or below a committed ceiling is ever issued twice, across
//!   threads or processes.
//! - Ids issued for one entity are strictly increasing.
//! - A crash forfeits the unused part of a lease; ids may have gaps.
//!
//! ```
//! # #[cfg(feature = "sqlite")] {
//! use blockid::{BlockAllocator, SqliteConnectionFactory, SqliteDialect};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let factory = SqliteConnectionFactory::new(dir.path().join("ids.db"));
//! let allocator = BlockAllocator::new(factory, &SqliteDialect);
//! allocator.ensure_schema().unwrap();
//!
//! let first = allocator.next_id("orders").unwrap();
//! let batch = allocator.next_ids("orders", 3).unwrap();
//! assert_eq!(first, 1);
//! assert_eq!(batch, vec![2, 3, 4]);
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

mod allocator;
mod cache;
mod config;
mod connection;
mod dialect;
mod error;
mod gateway;
mod mutex;
mod schema;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(test)]
mod test_support;
mod window;

pub use crate::allocator::*;
pub use crate::cache::*;
pub use crate::config::*;
pub use crate::connection::*;
pub use crate::dialect::*;
pub use crate::error::*;
pub use crate::gateway::*;
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
#[cfg(feature = "sqlite")]
pub use crate::sqlite::*;
pub use crate::schema::*;
pub use crate::window::*;
