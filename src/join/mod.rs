mod joiner;
mod matcher;

pub use joiner::*;
pub use matcher::*;
