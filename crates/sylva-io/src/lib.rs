//! Dataset loading and score output for the sylva pipeline.

mod error;
mod reader;
mod writer;

pub use error::IoError;
pub use reader::DatasetReader;
pub use writer::ScoreWriter;
