//! Message handling - Parsing, dispatch and background execution

pub mod parser;
pub mod pipeline;
pub mod shell;

pub use parser::{parse_line, ParsedLine};
pub use pipeline::{Job, Pipeline};
pub use shell::{Shell, UPLOAD_KEYWORD};
