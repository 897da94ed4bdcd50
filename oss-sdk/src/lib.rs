#![doc = include_str!("../README.md")]

pub mod bucket;
pub mod executor;
pub mod object;
pub mod region;
pub mod service;
pub mod sign_v4;

mod client;
mod config;
mod error;
mod utils;
mod xml;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{ClientError, Error};
pub use executor::{HttpTransport, RequestConfig, RequestOptions, ResponseResult};
pub use sign_v4::HTTPVerb;
