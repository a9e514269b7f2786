use diesel::prelude::*;

use crate::infrastructure::postgres::schema::payments;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(primary_key(payment_id))]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub payment_id: String,
    pub uid: String,
    pub amount: f64,
    pub memo: String,
    pub txid: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub payment_id: String,
    pub uid: String,
    pub amount: f64,
    pub memo: String,
    pub status: String,
}
