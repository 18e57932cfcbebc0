pub mod chart_client;
pub mod fetcher;
pub mod retry;

pub use chart_client::*;
pub use fetcher::*;
pub use retry::*;
