pub mod api;
pub mod confgen;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod options;

pub use confgen::{ConfGen, RunSummary};
pub use error::{ConfgenError, Result};
pub use options::Options;
