pub mod config;
pub mod endpoint;
pub mod error;

pub use config::*;
pub use endpoint::*;
pub use error::*;
