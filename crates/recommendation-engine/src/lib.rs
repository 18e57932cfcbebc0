pub mod classifier;
pub mod engine;
pub mod feed;
pub mod rules;

pub use classifier::*;
pub use engine::*;
pub use feed::*;
pub use rules::*;
