#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::Value;

use snarkgate_wallet_adapters::{RuntimeProfile, WalletAdapterConfig};

pub enum ScriptedResponse {
    Result(Value),
    RpcError(String),
    HttpError(u16),
}

/// One-thread HTTP fixture speaking just enough JSON-RPC for the
/// drivers: records every request body and answers from a script.
pub struct RpcFixture {
    pub url: String,
    requests: Arc<Mutex<Vec<Value>>>,
    script: Arc<Mutex<VecDeque<ScriptedResponse>>>,
}

impl RpcFixture {
    pub fn start() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind fixture server");
        let port = server
            .server_addr()
            .to_ip()
            .expect("fixture ip address")
            .port();
        let url = format!("http://127.0.0.1:{port}/");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let script: Arc<Mutex<VecDeque<ScriptedResponse>>> =
            Arc::new(Mutex::new(VecDeque::new()));

        let thread_requests = Arc::clone(&requests);
        let thread_script = Arc::clone(&script);
        thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                thread_requests.lock().expect("requests lock").push(parsed);

                let scripted = thread_script.lock().expect("script lock").pop_front();
                let (status, response_body) = match scripted {
                    Some(ScriptedResponse::Result(result)) => (
                        200u16,
                        serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": result })
                            .to_string(),
                    ),
                    Some(ScriptedResponse::RpcError(message)) => (
                        200,
                        serde_json::json!({
                            "jsonrpc": "2.0",
                            "id": 1,
                            "error": { "code": -32000, "message": message },
                        })
                        .to_string(),
                    ),
                    Some(ScriptedResponse::HttpError(status)) => (
                        status,
                        serde_json::json!({
                            "jsonrpc": "2.0",
                            "id": 1,
                            "error": { "code": -32000, "message": "unavailable" },
                        })
                        .to_string(),
                    ),
                    None => (
                        200,
                        serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": null })
                            .to_string(),
                    ),
                };
                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    &b"application/json"[..],
                )
                .expect("content-type header");
                let response = tiny_http::Response::from_string(response_body)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            url,
            requests,
            script,
        }
    }

    pub fn push_result(&self, result: Value) {
        self.script
            .lock()
            .expect("script lock")
            .push_back(ScriptedResponse::Result(result));
    }

    pub fn push_rpc_error(&self, message: &str) {
        self.script
            .lock()
            .expect("script lock")
            .push_back(ScriptedResponse::RpcError(message.to_owned()));
    }

    pub fn push_http_error(&self, status: u16) {
        self.script
            .lock()
            .expect("script lock")
            .push_back(ScriptedResponse::HttpError(status));
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_methods(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|request| {
                request
                    .get("method")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .collect()
    }

    pub fn request_params(&self, index: usize) -> Value {
        self.requests()
            .get(index)
            .and_then(|request| request.get("params"))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

pub fn service_config(url: &str) -> WalletAdapterConfig {
    WalletAdapterConfig {
        hosted_service_url: Some(url.to_owned()),
        extension_bridge_url: Some(url.to_owned()),
        ..WalletAdapterConfig::default()
    }
}

pub fn offline_config() -> WalletAdapterConfig {
    WalletAdapterConfig::default()
}

pub fn strict_config() -> WalletAdapterConfig {
    WalletAdapterConfig {
        profile: RuntimeProfile::Production,
        ..WalletAdapterConfig::default()
    }
}
