pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod store;
pub mod utils;

pub use error::{Error, Result};
