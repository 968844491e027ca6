pub mod config;
pub mod error;
pub mod model;
pub mod service;
pub mod task;

pub use error::Error;
