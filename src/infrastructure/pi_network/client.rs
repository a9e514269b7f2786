use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};
use url::Url;

use super::{
    failed_response_body,
    horizon::HorizonClient,
    transaction::{A2uTransaction, amount_to_stroops},
    wallet::{PiWallet, decode_address},
};
use crate::domain::{
    repositories::payment_gateway::PaymentGateway, value_objects::payments::NewGatewayPayment,
};

/// Seconds an A2U transaction stays valid after it is built.
const TRANSACTION_TIMEOUT_SECS: i64 = 180;

/// Pi platform API client plus the app wallet used to send A2U payments.
pub struct PiNetworkClient {
    http: reqwest::Client,
    api_key: String,
    base_url: Url,
    wallet: PiWallet,
}

/// The fields of a platform payment object needed to send it on-chain.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct A2uPayment {
    pub identifier: String,
    pub amount: f64,
    pub from_address: String,
    pub to_address: String,
    pub network: String,
    #[serde(default)]
    pub transaction: Option<LinkedTransaction>,
}

/// On-chain transaction the platform already links to a payment.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LinkedTransaction {
    pub txid: Option<String>,
}

impl A2uPayment {
    /// A payment whose txid is already linked was sent before; sending it
    /// again would pay the user twice.
    pub fn ensure_unlinked(&self) -> Result<()> {
        let linked_txid = self
            .transaction
            .as_ref()
            .and_then(|transaction| transaction.txid.as_deref())
            .filter(|txid| !txid.is_empty());

        match linked_txid {
            Some(txid) => bail!(
                "payment {} already has a linked txid {}",
                self.identifier,
                txid
            ),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PiErrorEnvelope {
    error: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedPaymentResp {
    identifier: String,
}

#[derive(Debug, Deserialize)]
struct IncompletePaymentsResp {
    incomplete_server_payments: Vec<Value>,
}

impl PiNetworkClient {
    pub fn new(
        api_key: String,
        wallet_private_seed: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            bail!("Pi API base URL {} cannot carry a path", base_url);
        }
        let wallet = PiWallet::from_seed(wallet_private_seed)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        info!(wallet = %wallet.address(), api = %base_url, "pi_network: client ready");

        Ok(Self {
            http,
            api_key,
            base_url,
            wallet,
        })
    }

    /// `{base}/v2/{segments...}` with every segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        if let Some(segment) = segments
            .iter()
            .find(|segment| matches!(segment.trim(), "" | "." | ".."))
        {
            bail!("invalid Pi API path segment {:?}", segment);
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Pi API base URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .push("v2")
            .extend(segments);
        Ok(url)
    }

    fn authorization(&self) -> String {
        format!("Key {}", self.api_key)
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let (status, body) = failed_response_body(resp).await;
        let (pi_error, pi_error_message) = match serde_json::from_str::<PiErrorEnvelope>(&body) {
            Ok(envelope) => (envelope.error, envelope.error_message),
            Err(_) => (None, None),
        };

        error!(
            status = %status,
            pi_error = ?pi_error,
            pi_error_message = ?pi_error_message,
            response_body = %body,
            context = %context,
            "pi platform api request failed"
        );

        bail!(
            "{}",
            platform_error_message(context, status, pi_error.as_deref(), pi_error_message.as_deref())
        );
    }

    pub async fn create_payment(&self, payment: &NewGatewayPayment) -> Result<String> {
        let resp = self
            .http
            .post(self.url(&["payments"])?)
            .header(AUTHORIZATION, self.authorization())
            .json(&json!({ "payment": payment }))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create payment").await?;

        let created: CreatedPaymentResp = resp.json().await?;
        Ok(created.identifier)
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<Value> {
        let resp = self
            .http
            .get(self.url(&["payments", payment_id])?)
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "get payment").await?;

        Ok(resp.json().await?)
    }

    pub async fn complete_payment(&self, payment_id: &str, txid: &str) -> Result<Value> {
        let resp = self
            .http
            .post(self.url(&["payments", payment_id, "complete"])?)
            .header(AUTHORIZATION, self.authorization())
            .json(&json!({ "txid": txid }))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "complete payment").await?;

        Ok(resp.json().await?)
    }

    pub async fn cancel_payment(&self, payment_id: &str) -> Result<Value> {
        let resp = self
            .http
            .post(self.url(&["payments", payment_id, "cancel"])?)
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "cancel payment").await?;

        Ok(resp.json().await?)
    }

    pub async fn list_incomplete_payments(&self) -> Result<Vec<Value>> {
        let resp = self
            .http
            .get(self.url(&["payments", "incomplete_server_payments"])?)
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "list incomplete payments").await?;

        let parsed: IncompletePaymentsResp = resp.json().await?;
        Ok(parsed.incomplete_server_payments)
    }

    /// Sends the payment from the app wallet on-chain and returns the txid.
    pub async fn submit_payment(&self, payment_id: &str) -> Result<String> {
        let payment: A2uPayment = serde_json::from_value(self.get_payment(payment_id).await?)?;
        payment.ensure_unlinked()?;

        let wallet_address = self.wallet.address();
        if payment.from_address != wallet_address {
            bail!(
                "payment {} is sent from {}, but the configured wallet is {}",
                payment.identifier,
                payment.from_address,
                wallet_address
            );
        }

        let horizon = HorizonClient::for_network(self.http.clone(), &payment.network)?;
        let sequence = horizon.load_sequence(&wallet_address).await?;
        let base_fee = horizon.fetch_base_fee().await?;
        let max_time = (Utc::now().timestamp() + TRANSACTION_TIMEOUT_SECS) as u64;

        let transaction = A2uTransaction::new(
            self.wallet.public_key(),
            decode_address(&payment.to_address)?,
            base_fee,
            sequence + 1,
            max_time,
            &payment.identifier,
            amount_to_stroops(payment.amount)?,
        )?;
        let signed = transaction.sign(&self.wallet, &payment.network);

        info!(
            payment_id = %payment.identifier,
            network = %payment.network,
            expected_txid = %signed.hash_hex(),
            "pi_network: submitting A2U transaction"
        );

        horizon.submit_transaction(&signed.envelope_base64()).await
    }
}

fn platform_error_message(
    context: &str,
    status: reqwest::StatusCode,
    pi_error: Option<&str>,
    pi_error_message: Option<&str>,
) -> String {
    match (pi_error, pi_error_message) {
        (_, Some(message)) => format!("Pi API request failed: {} ({}): {}", context, status, message),
        (Some(code), None) => format!("Pi API request failed: {} ({}): {}", context, status, code),
        (None, None) => format!("Pi API request failed: {} (status {})", context, status),
    }
}

#[async_trait]
impl PaymentGateway for PiNetworkClient {
    async fn create_payment(&self, payment: NewGatewayPayment) -> Result<String> {
        self.create_payment(&payment).await
    }

    async fn submit_payment(&self, payment_id: &str) -> Result<String> {
        self.submit_payment(payment_id).await
    }

    async fn complete_payment(&self, payment_id: &str, txid: &str) -> Result<Value> {
        self.complete_payment(payment_id, txid).await
    }

    async fn cancel_payment(&self, payment_id: &str) -> Result<Value> {
        self.cancel_payment(payment_id).await
    }

    async fn list_incomplete_payments(&self) -> Result<Vec<Value>> {
        self.list_incomplete_payments().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::pi_network::wallet::tests::test_seed;

    fn client(base_url: &str) -> PiNetworkClient {
        PiNetworkClient::new(
            "api-key".to_string(),
            &test_seed(),
            base_url,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn builds_platform_urls_without_double_slash() {
        let client = client("https://api.minepi.com/");

        assert_eq!(
            client.url(&["payments"]).unwrap().as_str(),
            "https://api.minepi.com/v2/payments"
        );
        assert_eq!(
            client.url(&["payments", "abc", "complete"]).unwrap().as_str(),
            "https://api.minepi.com/v2/payments/abc/complete"
        );
        assert_eq!(
            self::client("https://proxy.local/pi").url(&["payments"]).unwrap().as_str(),
            "https://proxy.local/pi/v2/payments"
        );
        assert_eq!(client.authorization(), "Key api-key");
    }

    #[test]
    fn payment_id_stays_inside_its_path_segment() {
        let client = client("https://api.minepi.com");

        let url = client.url(&["payments", "../me?x=", "complete"]).unwrap();
        assert_eq!(url.path(), "/v2/payments/..%2Fme%3Fx=/complete");
        assert_eq!(url.query(), None);
        assert_eq!(url.host_str(), Some("api.minepi.com"));

        assert!(client.url(&["payments", "..", "cancel"]).is_err());
        assert!(client.url(&["payments", "."]).is_err());
    }

    #[test]
    fn rejects_bad_base_url_and_seed() {
        assert!(
            PiNetworkClient::new("k".into(), &test_seed(), "not a url", Duration::from_secs(1))
                .is_err()
        );
        assert!(
            PiNetworkClient::new(
                "k".into(),
                "SBAD",
                "https://api.minepi.com",
                Duration::from_secs(1)
            )
            .is_err()
        );
    }

    #[test]
    fn reads_a2u_fields_from_platform_payment() {
        let payment = json!({
            "identifier": "pid1",
            "user_uid": "u1",
            "amount": 0.5,
            "memo": "m",
            "metadata": { "order": 7 },
            "from_address": "GFROM",
            "to_address": "GTO",
            "direction": "app_to_user",
            "network": "Pi Testnet",
            "status": { "developer_approved": true, "transaction_verified": false },
            "transaction": null
        });

        let parsed: A2uPayment = serde_json::from_value(payment).unwrap();
        assert_eq!(
            parsed,
            A2uPayment {
                identifier: "pid1".to_string(),
                amount: 0.5,
                from_address: "GFROM".to_string(),
                to_address: "GTO".to_string(),
                network: "Pi Testnet".to_string(),
                transaction: None,
            }
        );
        assert!(parsed.ensure_unlinked().is_ok());
    }

    #[test]
    fn refuses_to_resend_payment_with_linked_txid() {
        let payment = json!({
            "identifier": "pid1",
            "amount": 0.5,
            "from_address": "GFROM",
            "to_address": "GTO",
            "network": "Pi Testnet",
            "transaction": { "txid": "tx1", "verified": false, "_link": "https://horizon/tx1" }
        });

        let parsed: A2uPayment = serde_json::from_value(payment).unwrap();
        let err = parsed.ensure_unlinked().unwrap_err();
        assert_eq!(err.to_string(), "payment pid1 already has a linked txid tx1");

        let unlinked = A2uPayment {
            transaction: Some(LinkedTransaction { txid: None }),
            ..parsed
        };
        assert!(unlinked.ensure_unlinked().is_ok());
    }

    #[test]
    fn prefers_platform_error_message() {
        let status = reqwest::StatusCode::BAD_REQUEST;

        assert_eq!(
            platform_error_message(
                "create payment",
                status,
                Some("ongoing_payment_found"),
                Some("You need to complete the ongoing payment first")
            ),
            "Pi API request failed: create payment (400 Bad Request): You need to complete the ongoing payment first"
        );
        assert_eq!(
            platform_error_message("cancel payment", status, Some("payment_not_found"), None),
            "Pi API request failed: cancel payment (400 Bad Request): payment_not_found"
        );
        assert_eq!(
            platform_error_message("get payment", status, None, None),
            "Pi API request failed: get payment (status 400 Bad Request)"
        );
    }
}
