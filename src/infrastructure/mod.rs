pub mod axum_http;
pub mod pi_network;
pub mod postgres;
