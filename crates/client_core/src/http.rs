use reqwest::Client;
use shared::{domain::Truck, protocol::decode_truck_snapshot};

use crate::error::ClientError;

/// Plain HTTP access to the feed, used to prefetch trucks for list props.
#[derive(Clone)]
pub struct TruckFeedClient {
    http: Client,
    server_url: String,
}

impl TruckFeedClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_trucks(&self) -> Result<Vec<Truck>, ClientError> {
        let body = self
            .http
            .get(format!("{}/trucks", self.server_url))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(decode_truck_snapshot(&body)?)
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
