pub mod parse;
pub mod summary;

pub use parse::parse_output;
pub use summary::*;
