use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;

use crate::{
    domain::{
        entities::payments::{InsertPaymentEntity, PaymentEntity},
        repositories::payments::PaymentRepository,
        value_objects::enums::payment_statuses::PaymentStatus,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::payments},
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn find_pending_by_uid(&self, uid: &str) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let payment = payments::table
            .filter(payments::uid.eq(uid))
            .filter(payments::status.eq(PaymentStatus::Pending.as_str()))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(payment)
    }

    async fn insert_payment(&self, payment: InsertPaymentEntity) -> Result<String> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let payment_id = insert_into(payments::table)
            .values(&payment)
            .returning(payments::payment_id)
            .get_result::<String>(&mut conn)?;

        Ok(payment_id)
    }

    async fn update_txid(&self, payment_id: &str, txid: &str) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(payments::table.filter(payments::payment_id.eq(payment_id)))
            .set(payments::txid.eq(Some(txid)))
            .execute(&mut conn)?;

        Ok(updated)
    }

    async fn update_status(&self, payment_id: &str, status: PaymentStatus) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(payments::table.filter(payments::payment_id.eq(payment_id)))
            .set(payments::status.eq(status.as_str()))
            .execute(&mut conn)?;

        Ok(updated)
    }
}
