pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod identifier;
pub mod logging;
pub mod remote;
pub mod store;
pub mod transfer;

pub use config::Config;
pub use error::{Error, Result};
pub use identifier::VideoId;
