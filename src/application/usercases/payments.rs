use std::{fmt::Display, sync::Arc};

use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{
    repositories::{payment_gateway::PaymentGateway, payments::PaymentRepository},
    value_objects::{
        enums::payment_statuses::PaymentStatus,
        payments::{
            CancelPaymentModel, CompletePaymentModel, CreatePaymentModel, CreatedPayment,
            SubmitPaymentModel,
        },
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAction {
    Create,
    Submit,
    Complete,
    Cancel,
    ListIncomplete,
}

impl Display for PaymentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = match self {
            PaymentAction::Create => "create payment",
            PaymentAction::Submit => "submit payment",
            PaymentAction::Complete => "complete payment",
            PaymentAction::Cancel => "cancel payment",
            PaymentAction::ListIncomplete => "retrieve incomplete payments",
        };
        write!(f, "{}", action)
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invalid request body")]
    InvalidBody(String),
    #[error("Missing or invalid payment_id")]
    MissingPaymentId,
    #[error("Missing or invalid txid")]
    MissingTxid,
    #[error("Failed to {action}")]
    Gateway {
        action: PaymentAction,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to update payment ledger")]
    Ledger(#[source] anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::InvalidBody(_)
            | PaymentError::MissingPaymentId
            | PaymentError::MissingTxid => StatusCode::BAD_REQUEST,
            PaymentError::Gateway { .. } | PaymentError::Ledger(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Underlying failure message, reported to callers next to the error.
    pub fn details(&self) -> Option<String> {
        match self {
            PaymentError::InvalidBody(reason) => Some(reason.clone()),
            PaymentError::MissingPaymentId | PaymentError::MissingTxid => None,
            PaymentError::Gateway { source, .. } | PaymentError::Ledger(source) => {
                Some(format!("{:#}", source))
            }
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;

pub struct PaymentUseCase<R, G>
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    payment_repo: Arc<R>,
    payment_gateway: Arc<G>,
}

impl<R, G> PaymentUseCase<R, G>
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(payment_repo: Arc<R>, payment_gateway: Arc<G>) -> Self {
        Self {
            payment_repo,
            payment_gateway,
        }
    }

    /// Creates a payment for `uid`, or hands back the id of the payment that
    /// is still pending for that user. The lookup and the insert are not
    /// isolated from each other.
    pub async fn create_payment(
        &self,
        create_payment_model: CreatePaymentModel,
    ) -> UseCaseResult<CreatedPayment> {
        let uid = create_payment_model.uid.as_str();
        info!(%uid, "payments: create payment requested");

        let existing = self
            .payment_repo
            .find_pending_by_uid(uid)
            .await
            .map_err(|err| {
                error!(%uid, db_error = ?err, "payments: failed to look up pending payment");
                PaymentError::Ledger(err)
            })?;

        if let Some(existing) = existing {
            info!(
                %uid,
                payment_id = %existing.payment_id,
                "payments: pending payment already exists"
            );
            return Ok(CreatedPayment {
                payment_id: existing.payment_id,
                already_exists: true,
            });
        }

        let payment_id = self
            .payment_gateway
            .create_payment(create_payment_model.to_gateway_payment())
            .await
            .map_err(|err| {
                error!(%uid, gateway_error = ?err, "payments: gateway failed to create payment");
                PaymentError::Gateway {
                    action: PaymentAction::Create,
                    source: err,
                }
            })?;

        let inserted = match create_payment_model.to_entity(payment_id.clone()) {
            Ok(row) => self.payment_repo.insert_payment(row).await,
            Err(err) => Err(err),
        };
        let payment_id = inserted.map_err(|err| {
            // The payment exists on the network from here on; nothing rolls it back.
            error!(
                %uid,
                %payment_id,
                db_error = ?err,
                "payments: failed to record created payment"
            );
            PaymentError::Ledger(err)
        })?;

        info!(%uid, %payment_id, "payments: payment created");
        Ok(CreatedPayment {
            payment_id,
            already_exists: false,
        })
    }

    pub async fn submit_payment(
        &self,
        submit_payment_model: SubmitPaymentModel,
    ) -> UseCaseResult<String> {
        let payment_id = required_field(submit_payment_model.payment_id.as_deref())
            .ok_or(PaymentError::MissingPaymentId)?;
        info!(%payment_id, "payments: submitting payment");

        let txid = self
            .payment_gateway
            .submit_payment(payment_id)
            .await
            .map_err(|err| {
                error!(%payment_id, gateway_error = ?err, "payments: failed to submit payment");
                PaymentError::Gateway {
                    action: PaymentAction::Submit,
                    source: err,
                }
            })?;

        let updated = self
            .payment_repo
            .update_txid(payment_id, &txid)
            .await
            .map_err(|err| {
                error!(%payment_id, %txid, db_error = ?err, "payments: failed to store txid");
                PaymentError::Ledger(err)
            })?;
        if updated == 0 {
            warn!(%payment_id, %txid, "payments: submitted payment has no ledger row");
        }

        info!(%payment_id, %txid, "payments: payment submitted");
        Ok(txid)
    }

    pub async fn complete_payment(
        &self,
        complete_payment_model: CompletePaymentModel,
    ) -> UseCaseResult<Value> {
        let payment_id = required_field(complete_payment_model.payment_id.as_deref())
            .ok_or(PaymentError::MissingPaymentId)?;
        let txid = required_field(complete_payment_model.txid.as_deref())
            .ok_or(PaymentError::MissingTxid)?;
        info!(%payment_id, %txid, "payments: completing payment");

        let payment = self
            .payment_gateway
            .complete_payment(payment_id, txid)
            .await
            .map_err(|err| {
                error!(%payment_id, gateway_error = ?err, "payments: failed to complete payment");
                PaymentError::Gateway {
                    action: PaymentAction::Complete,
                    source: err,
                }
            })?;

        self.record_status(payment_id, PaymentStatus::Completed)
            .await?;

        Ok(payment)
    }

    pub async fn cancel_payment(
        &self,
        cancel_payment_model: CancelPaymentModel,
    ) -> UseCaseResult<Value> {
        let payment_id = required_field(cancel_payment_model.payment_id.as_deref())
            .ok_or(PaymentError::MissingPaymentId)?;
        info!(%payment_id, "payments: cancelling payment");

        let payment = self
            .payment_gateway
            .cancel_payment(payment_id)
            .await
            .map_err(|err| {
                error!(%payment_id, gateway_error = ?err, "payments: failed to cancel payment");
                PaymentError::Gateway {
                    action: PaymentAction::Cancel,
                    source: err,
                }
            })?;

        self.record_status(payment_id, PaymentStatus::Cancelled)
            .await?;

        Ok(payment)
    }

    pub async fn list_incomplete_payments(&self) -> UseCaseResult<Vec<Value>> {
        let payments = self
            .payment_gateway
            .list_incomplete_payments()
            .await
            .map_err(|err| {
                error!(gateway_error = ?err, "payments: failed to list incomplete payments");
                PaymentError::Gateway {
                    action: PaymentAction::ListIncomplete,
                    source: err,
                }
            })?;

        let payment_count = payments.len();
        info!(payment_count, "payments: incomplete payments loaded");
        Ok(payments)
    }

    async fn record_status(&self, payment_id: &str, status: PaymentStatus) -> UseCaseResult<()> {
        let updated = self
            .payment_repo
            .update_status(payment_id, status)
            .await
            .map_err(|err| {
                error!(
                    %payment_id,
                    %status,
                    db_error = ?err,
                    "payments: failed to update payment status"
                );
                PaymentError::Ledger(err)
            })?;

        if updated == 0 {
            warn!(%payment_id, %status, "payments: no ledger row to update");
        } else {
            info!(%payment_id, %status, "payments: payment status updated");
        }

        Ok(())
    }
}

fn required_field(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
