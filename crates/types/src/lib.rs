pub mod block;
pub mod time;
pub mod transaction;

pub use block::*;
pub use time::*;
pub use transaction::*;
