use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;

use crate::domain::value_objects::payments::NewGatewayPayment;

/// Remote payment network. Payment objects are returned as raw JSON so they
/// can be echoed back to callers untouched.
#[automock]
#[async_trait]
pub trait PaymentGateway {
    /// Returns the identifier the network assigned to the new payment.
    async fn create_payment(&self, payment: NewGatewayPayment) -> Result<String>;
    /// Sends the payment on-chain and returns the transaction id.
    async fn submit_payment(&self, payment_id: &str) -> Result<String>;
    async fn complete_payment(&self, payment_id: &str, txid: &str) -> Result<Value>;
    async fn cancel_payment(&self, payment_id: &str) -> Result<Value>;
    async fn list_incomplete_payments(&self) -> Result<Vec<Value>>;
}
