use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity},
    value_objects::enums::payment_statuses::PaymentStatus,
};

#[automock]
#[async_trait]
pub trait PaymentRepository {
    async fn find_pending_by_uid(&self, uid: &str) -> Result<Option<PaymentEntity>>;
    async fn insert_payment(&self, payment: InsertPaymentEntity) -> Result<String>;
    /// Returns the number of rows touched; zero when no row has `payment_id`.
    async fn update_txid(&self, payment_id: &str, txid: &str) -> Result<usize>;
    async fn update_status(&self, payment_id: &str, status: PaymentStatus) -> Result<usize>;
}
