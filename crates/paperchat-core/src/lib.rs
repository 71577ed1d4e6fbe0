pub mod pipeline;
pub mod prompt;

pub use pipeline::ChatSession;
