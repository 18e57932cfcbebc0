pub mod goal;
pub mod valuation;

pub use goal::*;
pub use valuation::*;
