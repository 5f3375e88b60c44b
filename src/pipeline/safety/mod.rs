pub mod types;
pub mod similarity;
pub mod grounding;

pub use types::*;
pub use similarity::*;
pub use grounding::*;
