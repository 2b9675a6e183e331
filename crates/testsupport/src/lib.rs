pub mod helpers;
pub mod server;
pub mod upstream;

pub use helpers::*;
pub use server::*;
pub use upstream::*;
