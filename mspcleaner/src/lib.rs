mod args;
mod driver;
mod proc;
mod progress;
mod write;

pub use args::{input_stem, OutputPaths};
pub use driver::{MspCleaner, MspCleanerError};
pub use progress::{OutputSummary, ReadProgress, RunSummary};
