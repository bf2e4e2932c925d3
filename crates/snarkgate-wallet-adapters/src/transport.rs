use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use snarkgate_wallet_core::DriverError;

/// Minimal JSON-RPC 2.0 client shared by the hosted-service and
/// extension-bridge drivers.
#[derive(Debug, Clone)]
pub struct RpcClient {
    base_url: String,
    client: reqwest::Client,
}

impl RpcClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, DriverError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DriverError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value, DriverError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        debug!(%method, url = %self.base_url, "rpc request");
        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DriverError::Transport(format!("{method} request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| DriverError::Transport(format!("{method} json decode failed: {e}")))?;
        if !status.is_success() {
            return Err(DriverError::Transport(format!(
                "{method} status {status}: {body}"
            )));
        }
        if let Some(err) = body.get("error") {
            return Err(DriverError::Transport(format!(
                "{method} returned error: {err}"
            )));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| DriverError::Transport(format!("{method} missing result")))
    }
}

pub(crate) fn result_string(result: &Value, key: &str, method: &str) -> Result<String, DriverError> {
    result
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| DriverError::Validation(format!("{method} response missing {key}")))
}

pub(crate) fn result_array(
    result: &Value,
    key: &str,
    method: &str,
) -> Result<Vec<Value>, DriverError> {
    result
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| DriverError::Validation(format!("{method} response missing {key}")))
}
