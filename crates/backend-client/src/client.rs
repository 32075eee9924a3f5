use std::time::Duration;

use async_trait::async_trait;
use onesat_primitives::{Deposit, DepositId};
use reqwest::Client;
use serde_json::Value;
use tracing::*;

use crate::{
    envelope::{decode_deposit, decode_deposit_list, open_envelope},
    errors::BackendError,
    traits::DepositApi,
};

/// HTTP client for the deposit backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    url: String,
    client: Client,
}

impl BackendClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let url = url.into().trim_end_matches('/').to_string();
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }

    async fn fetch(&self, path: &str) -> Result<Option<Value>, BackendError> {
        let url = format!("{}{}", self.url, path);
        trace!(%url, "fetching from backend");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        open_envelope(status, &body)
    }
}

#[async_trait]
impl DepositApi for BackendClient {
    async fn deposit(&self, id: &DepositId) -> Result<Option<Deposit>, BackendError> {
        match self.fetch(&format!("/deposit/{id}")).await? {
            Some(value) => decode_deposit(value).map(Some),
            None => Ok(None),
        }
    }

    async fn deposits_by_owner(&self, owner: &str) -> Result<Vec<Deposit>, BackendError> {
        let deposits = match self.fetch(&format!("/deposits/user/{owner}")).await? {
            Some(value) => decode_deposit_list(value)?,
            None => Vec::new(),
        };
        debug!(%owner, count = deposits.len(), "fetched owner deposits");
        Ok(deposits)
    }

    async fn created_deposits(&self) -> Result<Vec<Deposit>, BackendError> {
        match self.fetch("/deposits/created").await? {
            Some(value) => decode_deposit_list(value),
            None => Ok(Vec::new()),
        }
    }
}
