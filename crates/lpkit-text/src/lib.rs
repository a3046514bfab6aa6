mod parser;
mod writer;

pub use parser::{ParseError, parse};
pub use writer::write;
