//! BlockCypher REST client.
//!
//! Endpoints used, relative to `{api_base}/{chain}`:
//! - `GET  /addrs/{address}?unspentOnly=true&limit=50&includeScript=true`
//! - `GET  /addrs/{address}/balance`
//! - `POST /txs/push` with `{"tx": "<hex>"}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use satchel_core::error::LedgerError;
use satchel_core::traits::Ledger;
use satchel_core::types::{UnspentOutput, UnspentSet};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

/// Maximum unspent outputs requested per address query.
pub const UNSPENT_LIMIT: u32 = 50;

/// Ledger backed by the BlockCypher API.
#[derive(Debug, Clone)]
pub struct BlockCypher {
    client: Client,
    endpoint: String,
}

impl BlockCypher {
    /// `endpoint` is the chain root, e.g.
    /// `https://api.blockcypher.com/v1/btc/main`.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Http(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, LedgerError> {
        let url = format!("{}{path}", self.endpoint);
        debug!(%url, "ledger request");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::Http(e.to_string()))?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, LedgerError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| LedgerError::Http(e.to_string()))?;
    if !status.is_success() {
        return Err(status_error(status, body));
    }
    serde_json::from_str(&body).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
}

fn status_error(status: StatusCode, body: String) -> LedgerError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(e) if status == StatusCode::BAD_REQUEST => LedgerError::Rejected(e.error),
        _ => LedgerError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

// ── Response bodies ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AddressResponse {
    #[serde(default)]
    txrefs: Vec<TxRef>,
    #[serde(default)]
    unconfirmed_txrefs: Vec<TxRef>,
}

#[derive(Deserialize)]
struct TxRef {
    tx_hash: String,
    tx_output_n: u32,
    value: u64,
    #[serde(default)]
    script: String,
}

impl From<TxRef> for UnspentOutput {
    fn from(r: TxRef) -> Self {
        UnspentOutput {
            tx_hash: r.tx_hash,
            output_index: r.tx_output_n,
            script: r.script,
            value: r.value,
        }
    }
}

impl From<AddressResponse> for UnspentSet {
    fn from(r: AddressResponse) -> Self {
        UnspentSet {
            confirmed: r.txrefs.into_iter().map(Into::into).collect(),
            unconfirmed: r.unconfirmed_txrefs.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Deserialize)]
struct BalanceResponse {
    balance: u64,
}

#[derive(Deserialize)]
struct PushResponse {
    tx: PushedTx,
}

#[derive(Deserialize)]
struct PushedTx {
    hash: String,
}

#[async_trait]
impl Ledger for BlockCypher {
    async fn unspent_outputs(&self, address: &str) -> Result<UnspentSet, LedgerError> {
        let resp: AddressResponse = self
            .get(&format!(
                "/addrs/{address}?unspentOnly=true&limit={UNSPENT_LIMIT}&includeScript=true"
            ))
            .await?;
        let set = UnspentSet::from(resp);
        debug!(
            %address,
            confirmed = set.confirmed.len(),
            unconfirmed = set.unconfirmed.len(),
            "fetched unspent outputs"
        );
        Ok(set)
    }

    async fn balance(&self, address: &str) -> Result<u64, LedgerError> {
        let resp: BalanceResponse = self.get(&format!("/addrs/{address}/balance")).await?;
        Ok(resp.balance)
    }

    async fn broadcast(&self, tx_hex: &str) -> Result<String, LedgerError> {
        let url = format!("{}/txs/push", self.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "tx": tx_hex }))
            .send()
            .await
            .map_err(|e| LedgerError::Http(e.to_string()))?;
        let pushed: PushResponse = decode(resp).await?;
        debug!(hash = %pushed.tx.hash, "transaction pushed");
        Ok(pushed.tx.hash)
    }
}
