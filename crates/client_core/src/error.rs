use shared::error::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server_url must start with http://, https://, ws:// or wss://: {0}")]
    UnsupportedScheme(String),
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("server_url must not carry a query or fragment: {0}")]
    UnsupportedBase(String),
    #[error("invalid endpoint name {0:?}")]
    InvalidEndpoint(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid truck listing: {0}")]
    Decode(#[from] DecodeError),
}
