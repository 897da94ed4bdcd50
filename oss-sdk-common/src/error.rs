#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid header name: {0}")]
    InvalidHeaderName(String),
    #[error("invalid value for header `{name}`")]
    InvalidHeaderValue { name: String },
    #[error("format date time failed: {0}")]
    Format(#[from] time::error::Format),
}
