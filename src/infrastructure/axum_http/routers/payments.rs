use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::{
    application::usercases::payments::{PaymentError, PaymentUseCase},
    domain::{
        repositories::{payment_gateway::PaymentGateway, payments::PaymentRepository},
        value_objects::payments::{
            CancelPaymentModel, CompletePaymentModel, CreatePaymentModel, SubmitPaymentModel,
        },
    },
    infrastructure::{
        pi_network::client::PiNetworkClient,
        postgres::{postgres_connection::PgPoolSquad, repositories::payments::PaymentPostgres},
    },
};

#[derive(Debug, Serialize)]
pub struct CreatePaymentResponse {
    pub message: &'static str,
    pub payment_id: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitPaymentResponse {
    pub message: &'static str,
    pub txid: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub message: &'static str,
    pub payment: Value,
}

#[derive(Debug, Serialize)]
pub struct IncompletePaymentsResponse {
    pub message: &'static str,
    pub payments: Vec<Value>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, payment_gateway: Arc<PiNetworkClient>) -> Router {
    let payment_repository = PaymentPostgres::new(Arc::clone(&db_pool));
    let usecase = PaymentUseCase::new(Arc::new(payment_repository), payment_gateway);

    payment_router(Arc::new(usecase))
}

pub fn payment_router<R, G>(usecase: Arc<PaymentUseCase<R, G>>) -> Router
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/create_payment", post(create_payment::<R, G>))
        .route("/submit_payment", post(submit_payment::<R, G>))
        .route("/complete_payment", post(complete_payment::<R, G>))
        .route("/cancel_payment", post(cancel_payment::<R, G>))
        .route(
            "/get_incomplete_payments",
            get(get_incomplete_payments::<R, G>),
        )
        .with_state(usecase)
}

pub async fn create_payment<R, G>(
    State(usecase): State<Arc<PaymentUseCase<R, G>>>,
    payload: Result<Json<CreatePaymentModel>, JsonRejection>,
) -> Response
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let create_payment_model = match read_body("create_payment", payload) {
        Ok(create_payment_model) => create_payment_model,
        Err(response) => return response,
    };

    match usecase.create_payment(create_payment_model).await {
        Ok(created) => {
            let message = if created.already_exists {
                "Payment already exists"
            } else {
                "Payment created successfully"
            };
            (
                StatusCode::OK,
                Json(CreatePaymentResponse {
                    message,
                    payment_id: created.payment_id,
                }),
            )
                .into_response()
        }
        Err(err) => map_error("create_payment", err),
    }
}

pub async fn submit_payment<R, G>(
    State(usecase): State<Arc<PaymentUseCase<R, G>>>,
    payload: Result<Json<SubmitPaymentModel>, JsonRejection>,
) -> Response
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let submit_payment_model = match read_body("submit_payment", payload) {
        Ok(submit_payment_model) => submit_payment_model,
        Err(response) => return response,
    };

    match usecase.submit_payment(submit_payment_model).await {
        Ok(txid) => (
            StatusCode::OK,
            Json(SubmitPaymentResponse {
                message: "Payment submitted",
                txid,
            }),
        )
            .into_response(),
        Err(err) => map_error("submit_payment", err),
    }
}

pub async fn complete_payment<R, G>(
    State(usecase): State<Arc<PaymentUseCase<R, G>>>,
    payload: Result<Json<CompletePaymentModel>, JsonRejection>,
) -> Response
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let complete_payment_model = match read_body("complete_payment", payload) {
        Ok(complete_payment_model) => complete_payment_model,
        Err(response) => return response,
    };

    match usecase.complete_payment(complete_payment_model).await {
        Ok(payment) => (
            StatusCode::OK,
            Json(PaymentResponse {
                message: "Payment completed",
                payment,
            }),
        )
            .into_response(),
        Err(err) => map_error("complete_payment", err),
    }
}

pub async fn cancel_payment<R, G>(
    State(usecase): State<Arc<PaymentUseCase<R, G>>>,
    payload: Result<Json<CancelPaymentModel>, JsonRejection>,
) -> Response
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let cancel_payment_model = match read_body("cancel_payment", payload) {
        Ok(cancel_payment_model) => cancel_payment_model,
        Err(response) => return response,
    };

    match usecase.cancel_payment(cancel_payment_model).await {
        Ok(payment) => (
            StatusCode::OK,
            Json(PaymentResponse {
                message: "Payment cancelled",
                payment,
            }),
        )
            .into_response(),
        Err(err) => map_error("cancel_payment", err),
    }
}

pub async fn get_incomplete_payments<R, G>(
    State(usecase): State<Arc<PaymentUseCase<R, G>>>,
) -> Response
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    match usecase.list_incomplete_payments().await {
        Ok(payments) => (
            StatusCode::OK,
            Json(IncompletePaymentsResponse {
                message: "Incomplete payments retrieved",
                payments,
            }),
        )
            .into_response(),
        Err(err) => map_error("get_incomplete_payments", err),
    }
}

fn read_body<T>(label: &str, payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(model)| model)
        .map_err(|rejection| map_error(label, PaymentError::InvalidBody(rejection.body_text())))
}

fn map_error(label: &str, err: PaymentError) -> Response {
    let status = err.status_code();
    if status.is_client_error() {
        warn!(status = status.as_u16(), error = %err, "payments: {} rejected", label);
    }
    err.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::{
        payment_gateway::MockPaymentGateway, payments::MockPaymentRepository,
    };
    use anyhow::anyhow;
    use axum::body::to_bytes;
    use serde_json::json;

    type TestUseCase = PaymentUseCase<MockPaymentRepository, MockPaymentGateway>;

    fn state(repo: MockPaymentRepository, gateway: MockPaymentGateway) -> State<Arc<TestUseCase>> {
        State(Arc::new(PaymentUseCase::new(Arc::new(repo), Arc::new(gateway))))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn serve(repo: MockPaymentRepository, gateway: MockPaymentGateway) -> String {
        let app = payment_router(Arc::new(PaymentUseCase::new(
            Arc::new(repo),
            Arc::new(gateway),
        )));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    async fn post_json(url: String, body: Value) -> (u16, Value) {
        let resp = reqwest::Client::new()
            .post(url)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    #[tokio::test]
    async fn create_then_repeat_reports_existing_payment() {
        let mut repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        repo.expect_find_pending_by_uid().times(1).returning(|_| Ok(None));
        gateway
            .expect_create_payment()
            .returning(|_| Ok("pid1".to_string()));
        repo.expect_insert_payment()
            .returning(|row| Ok(row.payment_id));

        let request = CreatePaymentModel {
            uid: "u1".to_string(),
            amount: json!(1),
            memo: json!("m"),
            metadata: Value::Null,
        };
        let response = create_payment(state(repo, gateway), Ok(Json(request.clone()))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Payment created successfully", "payment_id": "pid1" })
        );

        let mut repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        repo.expect_find_pending_by_uid().returning(|uid| {
            Ok(Some(crate::domain::entities::payments::PaymentEntity {
                payment_id: "pid1".to_string(),
                uid: uid.to_string(),
                amount: 1.0,
                memo: "m".to_string(),
                txid: None,
                status: "pending".to_string(),
            }))
        });
        gateway.expect_create_payment().never();
        repo.expect_insert_payment().never();

        let response = create_payment(state(repo, gateway), Ok(Json(request))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Payment already exists", "payment_id": "pid1" })
        );
    }

    #[tokio::test]
    async fn submit_with_blank_payment_id_is_bad_request() {
        let repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_submit_payment().never();

        let response = submit_payment(
            state(repo, gateway),
            Ok(Json(SubmitPaymentModel {
                payment_id: Some(String::new()),
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Missing or invalid payment_id" })
        );
    }

    #[tokio::test]
    async fn submit_returns_txid() {
        let mut repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_submit_payment()
            .returning(|_| Ok("tx1".to_string()));
        repo.expect_update_txid().returning(|_, _| Ok(0));

        let response = submit_payment(
            state(repo, gateway),
            Ok(Json(SubmitPaymentModel {
                payment_id: Some("pid1".to_string()),
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Payment submitted", "txid": "tx1" })
        );
    }

    #[tokio::test]
    async fn submit_gateway_failure_reports_details() {
        let repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_submit_payment()
            .returning(|_| Err(anyhow!("tx_bad_seq")));

        let response = submit_payment(
            state(repo, gateway),
            Ok(Json(SubmitPaymentModel {
                payment_id: Some("pid1".to_string()),
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Failed to submit payment", "details": "tx_bad_seq" })
        );
    }

    #[tokio::test]
    async fn complete_echoes_gateway_payment() {
        let mut repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        let payment = json!({ "identifier": "pid1", "amount": 1.0, "memo": "m" });
        let returned = payment.clone();
        gateway
            .expect_complete_payment()
            .returning(move |_, _| Ok(returned.clone()));
        repo.expect_update_status().returning(|_, _| Ok(1));

        let response = complete_payment(
            state(repo, gateway),
            Ok(Json(CompletePaymentModel {
                payment_id: Some("pid1".to_string()),
                txid: Some("tx1".to_string()),
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Payment completed", "payment": payment })
        );
    }

    #[tokio::test]
    async fn cancel_without_payment_id_is_bad_request() {
        let repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_cancel_payment().never();

        let response =
            cancel_payment(state(repo, gateway), Ok(Json(CancelPaymentModel::default()))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Missing or invalid payment_id" })
        );
    }

    #[tokio::test]
    async fn cancel_echoes_gateway_payment() {
        let mut repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        let payment = json!({ "identifier": "pid1", "status": { "cancelled": true } });
        let returned = payment.clone();
        gateway
            .expect_cancel_payment()
            .returning(move |_| Ok(returned.clone()));
        repo.expect_update_status().returning(|_, _| Ok(1));

        let response = cancel_payment(
            state(repo, gateway),
            Ok(Json(CancelPaymentModel {
                payment_id: Some("pid1".to_string()),
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Payment cancelled", "payment": payment })
        );
    }

    #[tokio::test]
    async fn incomplete_payments_failure_reports_details() {
        let repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_list_incomplete_payments()
            .returning(|| {
                Err(anyhow!(
                    "Pi API request failed: list incomplete payments (status 401 Unauthorized)"
                ))
            });

        let response = get_incomplete_payments(state(repo, gateway)).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({
                "error": "Failed to retrieve incomplete payments",
                "details": "Pi API request failed: list incomplete payments (status 401 Unauthorized)"
            })
        );
    }

    #[tokio::test]
    async fn incomplete_payments_are_listed() {
        let repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_list_incomplete_payments()
            .returning(|| Ok(vec![json!({ "identifier": "pid1" })]));

        let response = get_incomplete_payments(state(repo, gateway)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "message": "Incomplete payments retrieved",
                "payments": [{ "identifier": "pid1" }]
            })
        );
    }

    #[tokio::test]
    async fn routed_submit_and_cancel_reject_unusable_ids() {
        let repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_submit_payment().never();
        gateway.expect_cancel_payment().never();
        let base = serve(repo, gateway).await;

        for path in ["submit_payment", "cancel_payment"] {
            for body in [json!({}), json!({ "payment_id": "  " }), json!({ "payment_id": 123 })] {
                let (status, body) = post_json(format!("{}/{}", base, path), body).await;

                assert_eq!(status, 400);
                assert_eq!(body, json!({ "error": "Missing or invalid payment_id" }));
            }
        }
    }

    #[tokio::test]
    async fn routed_complete_rejects_non_string_txid() {
        let repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_complete_payment().never();
        let base = serve(repo, gateway).await;

        let (status, body) = post_json(
            format!("{}/complete_payment", base),
            json!({ "payment_id": "pid1", "txid": false }),
        )
        .await;

        assert_eq!(status, 400);
        assert_eq!(body, json!({ "error": "Missing or invalid txid" }));
    }

    #[tokio::test]
    async fn routed_create_forwards_amount_as_sent() {
        let mut repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        repo.expect_find_pending_by_uid().returning(|_| Ok(None));
        gateway
            .expect_create_payment()
            .withf(|payment| payment.amount == json!("1") && payment.memo == Value::Null)
            .times(1)
            .returning(|_| Ok("pid1".to_string()));
        repo.expect_insert_payment()
            .withf(|row| row.amount == 1.0 && row.memo.is_empty())
            .returning(|row| Ok(row.payment_id));
        let base = serve(repo, gateway).await;

        let (status, body) = post_json(
            format!("{}/create_payment", base),
            json!({ "uid": "u1", "amount": "1" }),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(
            body,
            json!({ "message": "Payment created successfully", "payment_id": "pid1" })
        );
    }

    #[tokio::test]
    async fn routed_malformed_body_is_json_bad_request() {
        let repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_payment().never();
        let base = serve(repo, gateway).await;

        let resp = reqwest::Client::new()
            .post(format!("{}/create_payment", base))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status().as_u16(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Invalid request body");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn routed_incomplete_payments_is_get_only() {
        let repo = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_list_incomplete_payments()
            .times(1)
            .returning(|| Ok(vec![json!({ "identifier": "pid1" })]));
        let base = serve(repo, gateway).await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("{}/get_incomplete_payments", base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["payments"], json!([{ "identifier": "pid1" }]));

        let resp = client
            .post(format!("{}/get_incomplete_payments", base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 405);
    }
}
