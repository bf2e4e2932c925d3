use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use snarkgate_wallet_core::{
    ConnectedAccount, DecryptPermission, DriverError, HistoryQuery, RecordQuery,
    TransactionRequest, WalletDriver, WalletKind, WalletNetwork,
};

use crate::config::WalletAdapterConfig;
use crate::offline;
use crate::transport::{result_array, result_string, RpcClient};

/// Driver for the hosted (Puzzle) wallet service. Talks JSON-RPC to the
/// hosted API when an endpoint is configured; otherwise falls back to a
/// deterministic offline implementation, unless the production profile
/// forbids it.
#[derive(Debug, Clone)]
pub struct HostedDriver {
    mode: HostedMode,
    app_name: String,
    app_description: String,
    network: WalletNetwork,
    program_ids: Vec<String>,
    session: Arc<Mutex<HostedSession>>,
}

#[derive(Debug, Clone)]
enum HostedMode {
    Disabled(String),
    Deterministic,
    Service(RpcClient),
}

#[derive(Debug, Default)]
struct HostedSession {
    connected: bool,
    address: Option<String>,
}

impl Default for HostedDriver {
    fn default() -> Self {
        Self::new(&WalletAdapterConfig::from_env())
    }
}

impl HostedDriver {
    pub fn new(config: &WalletAdapterConfig) -> Self {
        let mode = match &config.hosted_service_url {
            Some(url) => match RpcClient::new(url.clone(), config.request_timeout()) {
                Ok(client) => HostedMode::Service(client),
                Err(err) => {
                    if config.strict_runtime_required() {
                        HostedMode::Disabled(format!(
                            "failed to initialize hosted service client in production profile: {err}"
                        ))
                    } else {
                        HostedMode::Deterministic
                    }
                }
            },
            None => {
                if config.strict_runtime_required() {
                    HostedMode::Disabled(
                        "hosted service URL not configured in production profile".to_owned(),
                    )
                } else {
                    HostedMode::Deterministic
                }
            }
        };

        Self {
            mode,
            app_name: config.app_name.clone(),
            app_description: config.app_description.clone(),
            network: config.network,
            program_ids: config.program_ids.clone(),
            session: Arc::new(Mutex::new(HostedSession::default())),
        }
    }

    fn check_mode(&self) -> Result<(), DriverError> {
        if let HostedMode::Disabled(reason) = &self.mode {
            return Err(DriverError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn session(&self) -> MutexGuard<'_, HostedSession> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn remember_account(&self, account: &ConnectedAccount) {
        let mut session = self.session();
        session.connected = true;
        session.address = Some(account.address.clone());
    }

    fn deterministic_account(&self) -> ConnectedAccount {
        ConnectedAccount::new(offline::deterministic_address(&self.app_name))
    }

    fn connect_params(&self) -> Value {
        let mut program_permissions = serde_json::Map::new();
        program_permissions.insert(
            self.network.wire_value().to_owned(),
            serde_json::json!(self.program_ids),
        );
        serde_json::json!({
            "dAppInfo": {
                "name": self.app_name,
                "description": self.app_description,
            },
            "permissions": {
                "programIds": program_permissions,
            },
        })
    }

    fn records_params(&self, query: &RecordQuery) -> Value {
        let mut filter = serde_json::Map::new();
        filter.insert(
            "programIds".to_owned(),
            serde_json::json!([query.program_id]),
        );
        if let Some(status) = query.status {
            filter.insert("status".to_owned(), serde_json::json!(status));
        }
        let mut params = serde_json::Map::new();
        params.insert("filter".to_owned(), Value::Object(filter));
        if let Some(address) = self.session().address.clone() {
            params.insert("address".to_owned(), Value::String(address));
        }
        Value::Object(params)
    }

    async fn fetch_records(&self, query: &RecordQuery) -> Result<Vec<Value>, DriverError> {
        self.check_mode()?;
        match &self.mode {
            HostedMode::Service(client) => {
                let result = client
                    .call("wallet_getRecords", self.records_params(query))
                    .await?;
                result_array(&result, "records", "wallet_getRecords")
            }
            _ => {
                let owner = self.deterministic_account().address;
                Ok(vec![
                    offline::deterministic_record(&owner, &query.program_id, 0, true),
                    offline::deterministic_record(&owner, &query.program_id, 1, true),
                ])
            }
        }
    }
}

#[async_trait]
impl WalletDriver for HostedDriver {
    fn kind(&self) -> WalletKind {
        WalletKind::Puzzle
    }

    async fn probe_session(&self) -> Result<Option<ConnectedAccount>, DriverError> {
        self.check_mode()?;
        match &self.mode {
            HostedMode::Service(client) => {
                match client.call("wallet_getAccount", serde_json::json!({})).await {
                    Ok(result) => {
                        let account = account_from_value(&result);
                        if let Some(ref account) = account {
                            self.remember_account(account);
                        }
                        Ok(account)
                    }
                    Err(err) => {
                        // The hosted API answers the account query with an
                        // error when no session exists; treat any failure
                        // here as "not connected".
                        debug!(error = %err, "hosted account probe failed");
                        Ok(None)
                    }
                }
            }
            _ => {
                let session = self.session();
                if session.connected {
                    Ok(session.address.clone().map(ConnectedAccount::new))
                } else {
                    Ok(None)
                }
            }
        }
    }

    async fn connect(
        &self,
        _permission: DecryptPermission,
    ) -> Result<ConnectedAccount, DriverError> {
        // The hosted service scopes access by program ids in the connect
        // payload rather than by a decrypt-permission parameter.
        self.check_mode()?;
        match &self.mode {
            HostedMode::Service(client) => {
                let result = client.call("wallet_connect", self.connect_params()).await?;
                if result.get("connection").map_or(true, Value::is_null) {
                    return Err(DriverError::Validation(
                        "wallet_connect response missing connection".to_owned(),
                    ));
                }
                let result = client.call("wallet_getAccount", serde_json::json!({})).await?;
                let account = account_from_value(&result).ok_or_else(|| {
                    DriverError::NotFound("connected but no account address returned".to_owned())
                })?;
                self.remember_account(&account);
                Ok(account)
            }
            _ => {
                let account = self.deterministic_account();
                self.remember_account(&account);
                Ok(account)
            }
        }
    }

    async fn disconnect(&self) -> Result<(), DriverError> {
        self.check_mode()?;
        let outcome = match &self.mode {
            HostedMode::Service(client) => client
                .call("wallet_disconnect", serde_json::json!({}))
                .await
                .map(|_| ()),
            _ => Ok(()),
        };
        let mut session = self.session();
        session.connected = false;
        session.address = None;
        outcome
    }

    async fn create_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<String, DriverError> {
        self.check_mode()?;
        match &self.mode {
            HostedMode::Service(client) => {
                let params = serde_json::json!({
                    "type": "Execute",
                    "programId": request.program_id,
                    "functionId": request.function_name,
                    "fee": request.fee,
                    "inputs": request.inputs,
                });
                let result = client.call("wallet_createEvent", params).await?;
                result_string(&result, "eventId", "wallet_createEvent")
            }
            _ => {
                let inputs = serde_json::to_string(&request.inputs).unwrap_or_default();
                Ok(format!(
                    "at1{}",
                    offline::short_digest(&[
                        request.program_id.as_bytes(),
                        request.function_name.as_bytes(),
                        inputs.as_bytes(),
                        &request.fee.to_le_bytes(),
                    ])
                ))
            }
        }
    }

    async fn sign_message(&self, message: &str) -> Result<String, DriverError> {
        self.check_mode()?;
        match &self.mode {
            HostedMode::Service(client) => {
                let result = client
                    .call(
                        "wallet_requestSignature",
                        serde_json::json!({ "message": message }),
                    )
                    .await?;
                result_string(&result, "signature", "wallet_requestSignature")
            }
            _ => Ok(format!(
                "sign1{}",
                offline::short_digest(&[self.app_name.as_bytes(), message.as_bytes()])
            )),
        }
    }

    async fn decrypt(&self, ciphertexts: &[String]) -> Result<Vec<String>, DriverError> {
        self.check_mode()?;
        match &self.mode {
            HostedMode::Service(client) => {
                let result = client
                    .call(
                        "wallet_decrypt",
                        serde_json::json!({ "ciphertexts": ciphertexts }),
                    )
                    .await?;
                let plaintexts = result
                    .get("plaintexts")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        DriverError::Validation(
                            "wallet_decrypt response missing plaintexts".to_owned(),
                        )
                    })?;
                plaintexts
                    .iter()
                    .map(|p| {
                        p.as_str().map(str::to_owned).ok_or_else(|| {
                            DriverError::Validation(
                                "wallet_decrypt plaintext must be a string".to_owned(),
                            )
                        })
                    })
                    .collect()
            }
            _ => {
                let owner = self.deterministic_account().address;
                Ok(ciphertexts
                    .iter()
                    .map(|c| offline::deterministic_plaintext(&owner, c))
                    .collect())
            }
        }
    }

    async fn records(&self, query: &RecordQuery) -> Result<Vec<Value>, DriverError> {
        self.fetch_records(query).await
    }

    async fn record_plaintexts(&self, query: &RecordQuery) -> Result<Vec<Value>, DriverError> {
        // The hosted get-records response already carries plaintext, so
        // the plaintext query is the same call.
        self.fetch_records(query).await
    }

    async fn transaction_history(&self, query: &HistoryQuery) -> Result<Vec<Value>, DriverError> {
        self.check_mode()?;
        match &self.mode {
            HostedMode::Service(client) => {
                let mut filter = serde_json::Map::new();
                filter.insert(
                    "programId".to_owned(),
                    Value::String(query.program_id.clone()),
                );
                if let Some(kind) = query.event_kind {
                    filter.insert("type".to_owned(), serde_json::json!(kind));
                }
                if let Some(ref function_id) = query.function_id {
                    filter.insert("functionId".to_owned(), Value::String(function_id.clone()));
                }
                let result = client
                    .call(
                        "wallet_getEvents",
                        serde_json::json!({ "filter": Value::Object(filter) }),
                    )
                    .await?;
                result_array(&result, "events", "wallet_getEvents")
            }
            _ => Ok(vec![
                offline::deterministic_event(&query.program_id, query.function_id.as_deref(), 0),
                offline::deterministic_event(&query.program_id, query.function_id.as_deref(), 1),
            ]),
        }
    }
}

fn account_from_value(value: &Value) -> Option<ConnectedAccount> {
    value
        .get("account")
        .and_then(|account| account.get("address"))
        .and_then(Value::as_str)
        .map(ConnectedAccount::new)
}
