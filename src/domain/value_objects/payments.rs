use anyhow::{Result, anyhow};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{
    entities::payments::InsertPaymentEntity, value_objects::enums::payment_statuses::PaymentStatus,
};

/// Create request as received. `amount`, `memo` and `metadata` reach the
/// gateway exactly as the caller sent them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreatePaymentModel {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub memo: Value,
    #[serde(default)]
    pub metadata: Value,
}

impl CreatePaymentModel {
    pub fn to_gateway_payment(&self) -> NewGatewayPayment {
        NewGatewayPayment {
            amount: self.amount.clone(),
            memo: self.memo.clone(),
            metadata: self.metadata.clone(),
            uid: self.uid.clone(),
        }
    }

    pub fn to_entity(&self, payment_id: String) -> Result<InsertPaymentEntity> {
        let amount = ledger_amount(&self.amount)
            .ok_or_else(|| anyhow!("amount {} cannot be stored as a number", self.amount))?;

        Ok(InsertPaymentEntity {
            payment_id,
            uid: self.uid.clone(),
            amount,
            memo: ledger_memo(&self.memo),
            status: PaymentStatus::Pending.to_string(),
        })
    }
}

fn ledger_amount(amount: &Value) -> Option<f64> {
    match amount {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn ledger_memo(memo: &Value) -> String {
    match memo {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Any non-string value reads as absent, so it fails the same check as a
/// missing field.
fn string_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(Some(text)),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubmitPaymentModel {
    #[serde(default, deserialize_with = "string_or_none")]
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletePaymentModel {
    #[serde(default, deserialize_with = "string_or_none")]
    pub payment_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub txid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CancelPaymentModel {
    #[serde(default, deserialize_with = "string_or_none")]
    pub payment_id: Option<String>,
}

/// Payment data handed to the gateway on creation. Field names follow the
/// Pi platform API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewGatewayPayment {
    pub amount: Value,
    pub memo: Value,
    pub metadata: Value,
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPayment {
    pub payment_id: String,
    pub already_exists: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_body_is_taken_as_sent() {
        let model: CreatePaymentModel =
            serde_json::from_value(json!({ "uid": "u1", "amount": "1" })).unwrap();

        assert_eq!(model.amount, json!("1"));
        assert_eq!(model.memo, Value::Null);
        assert_eq!(
            model.to_gateway_payment(),
            NewGatewayPayment {
                amount: json!("1"),
                memo: Value::Null,
                metadata: Value::Null,
                uid: "u1".to_string(),
            }
        );
    }

    #[test]
    fn ledger_row_reads_numeric_amounts() {
        let model = CreatePaymentModel {
            uid: "u1".to_string(),
            amount: json!(" 2.5 "),
            memo: json!("m"),
            metadata: Value::Null,
        };
        let row = model.to_entity("pid1".to_string()).unwrap();
        assert_eq!(row.amount, 2.5);
        assert_eq!(row.memo, "m");
        assert_eq!(row.status, "pending");

        let model = CreatePaymentModel {
            amount: json!({ "value": 1 }),
            ..model
        };
        assert!(model.to_entity("pid1".to_string()).is_err());
    }

    #[test]
    fn non_string_ids_read_as_missing() {
        let submit: SubmitPaymentModel =
            serde_json::from_value(json!({ "payment_id": 123 })).unwrap();
        assert_eq!(submit.payment_id, None);

        let complete: CompletePaymentModel =
            serde_json::from_value(json!({ "payment_id": "pid1", "txid": ["tx1"] })).unwrap();
        assert_eq!(complete.payment_id.as_deref(), Some("pid1"));
        assert_eq!(complete.txid, None);

        let cancel: CancelPaymentModel = serde_json::from_value(json!({})).unwrap();
        assert_eq!(cancel.payment_id, None);
    }
}
