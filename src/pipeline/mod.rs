pub mod categorize;
pub mod extractor;
pub mod gemini;
pub mod intake;
pub mod materialize;
pub mod orchestrator;

pub use extractor::*;
pub use intake::*;
pub use materialize::*;
pub use orchestrator::*;
