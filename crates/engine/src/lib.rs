pub mod authorizer;
pub mod gateway;
pub mod matcher;
pub mod resolver;
pub mod validator;

pub use gateway::{MockEngine, MockRequest};
pub use resolver::{Resolution, Resolver};
