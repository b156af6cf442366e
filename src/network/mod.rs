pub mod constants;
pub mod core_utils;
pub mod driver;
pub mod endpoint;
pub mod link;
pub mod metadata;
pub mod resolver;
pub mod types;

pub use driver::{DriverConfig, NetworkDriver};
