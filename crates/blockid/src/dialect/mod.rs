mod interface;
mod mysql;
mod postgres;
mod sqlite;
#[cfg(test)]
mod tests;

pub use interface::*;
pub use mysql::*;
pub use postgres::*;
pub use sqlite::*;
