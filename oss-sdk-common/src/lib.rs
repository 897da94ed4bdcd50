//! Helpers shared by the oss-sdk crates.

mod error;
pub mod helper;

pub use error::Error;
