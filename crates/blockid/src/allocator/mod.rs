mod block;
mod growth;
mod interface;

pub use block::*;
pub use growth::*;
pub use interface::*;
