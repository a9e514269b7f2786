use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, error};

use super::failed_response_body;

pub const MAINNET_PASSPHRASE: &str = "Pi Network";
pub const TESTNET_PASSPHRASE: &str = "Pi Testnet";

const MAINNET_HORIZON_URL: &str = "https://api.mainnet.minepi.com";
const TESTNET_HORIZON_URL: &str = "https://api.testnet.minepi.com";

/// Horizon server of the Pi blockchain a payment lives on.
pub struct HorizonClient {
    http: reqwest::Client,
    base_url: &'static str,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    sequence: String,
}

#[derive(Debug, Deserialize)]
struct FeeStatsResponse {
    last_ledger_base_fee: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct HorizonProblem {
    title: Option<String>,
    extras: Option<HorizonProblemExtras>,
}

#[derive(Debug, Deserialize)]
struct HorizonProblemExtras {
    result_codes: Option<serde_json::Value>,
}

pub fn horizon_url(network: &str) -> Result<&'static str> {
    match network {
        MAINNET_PASSPHRASE => Ok(MAINNET_HORIZON_URL),
        TESTNET_PASSPHRASE => Ok(TESTNET_HORIZON_URL),
        other => bail!("unsupported Pi network: {}", other),
    }
}

impl HorizonClient {
    pub fn for_network(http: reqwest::Client, network: &str) -> Result<Self> {
        Ok(Self {
            http,
            base_url: horizon_url(network)?,
        })
    }

    pub async fn load_sequence(&self, address: &str) -> Result<i64> {
        let resp = self
            .http
            .get(format!("{}/accounts/{}", self.base_url, address))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "load account").await?;

        let account: AccountResponse = resp.json().await?;
        let sequence = account
            .sequence
            .parse::<i64>()
            .with_context(|| format!("invalid account sequence {:?}", account.sequence))?;

        debug!(%address, sequence, "horizon: account loaded");
        Ok(sequence)
    }

    pub async fn fetch_base_fee(&self) -> Result<u32> {
        let resp = self
            .http
            .get(format!("{}/fee_stats", self.base_url))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "fetch fee stats").await?;

        let stats: FeeStatsResponse = resp.json().await?;
        let fee = stats
            .last_ledger_base_fee
            .parse::<u32>()
            .with_context(|| format!("invalid base fee {:?}", stats.last_ledger_base_fee))?;

        Ok(fee)
    }

    /// Posts a base64 transaction envelope and returns the transaction hash.
    pub async fn submit_transaction(&self, envelope_base64: &str) -> Result<String> {
        let resp = self
            .http
            .post(format!("{}/transactions", self.base_url))
            .form(&[("tx", envelope_base64)])
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "submit transaction").await?;

        let submitted: SubmitResponse = resp.json().await?;
        Ok(submitted.hash)
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let (status, body) = failed_response_body(resp).await;
        let (title, result_codes) = match serde_json::from_str::<HorizonProblem>(&body) {
            Ok(problem) => (
                problem.title,
                problem.extras.and_then(|extras| extras.result_codes),
            ),
            Err(_) => (None, None),
        };

        error!(
            status = %status,
            horizon_title = ?title,
            horizon_result_codes = ?result_codes,
            response_body = %body,
            context = %context,
            "horizon request failed"
        );

        match result_codes {
            Some(codes) => bail!(
                "Horizon request failed: {} (status {}, result_codes={})",
                context,
                status,
                codes
            ),
            None => bail!("Horizon request failed: {} (status {})", context, status),
        }
    }
}
