pub mod client;
pub mod horizon;
pub mod transaction;
pub mod wallet;

/// Status and body text of a failed response.
async fn failed_response_body(resp: reqwest::Response) -> (reqwest::StatusCode, String) {
    let status = resp.status();
    let body = match resp.text().await {
        Ok(text) if !text.is_empty() => text,
        Ok(_) => "<empty response body>".to_string(),
        Err(err) => format!("<failed to read response body: {err}>"),
    };

    (status, body)
}
