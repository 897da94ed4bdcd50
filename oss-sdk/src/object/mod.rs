mod basic;
mod presign;
mod types_rs;

pub use presign::{MAX_EXPIRES_SECS, PresignUrl, PresignUrlBuilder};
pub use types_rs::*;
