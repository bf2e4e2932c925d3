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

/// Per-wallet wiring for the extension driver. The three supported
/// extensions share one call surface; they differ in RPC namespace,
/// network naming, and whether a direct account query is worth trying
/// before the full connect prompt.
#[derive(Debug, Clone)]
pub struct ExtensionProfile {
    pub kind: WalletKind,
    pub rpc_namespace: &'static str,
    pub direct_account_probe: bool,
}

impl ExtensionProfile {
    pub fn leo() -> Self {
        Self {
            kind: WalletKind::Leo,
            rpc_namespace: "leo",
            direct_account_probe: true,
        }
    }

    pub fn fox() -> Self {
        Self {
            kind: WalletKind::Fox,
            rpc_namespace: "fox",
            direct_account_probe: false,
        }
    }

    pub fn soter() -> Self {
        Self {
            kind: WalletKind::Soter,
            rpc_namespace: "soter",
            direct_account_probe: false,
        }
    }
}

/// Driver for a browser-extension wallet reached through the local
/// extension bridge. Extensions decrypt a single ciphertext per request
/// and expose no pre-existing-session query, so `probe_session` keeps the
/// trait default.
#[derive(Debug, Clone)]
pub struct ExtensionDriver {
    profile: ExtensionProfile,
    mode: ExtensionMode,
    app_name: String,
    network: WalletNetwork,
    program_ids: Vec<String>,
    address: Arc<Mutex<Option<String>>>,
}

#[derive(Debug, Clone)]
enum ExtensionMode {
    Disabled(String),
    Deterministic,
    Bridge(RpcClient),
}

impl ExtensionDriver {
    pub fn new(profile: ExtensionProfile, config: &WalletAdapterConfig) -> Self {
        let mode = match &config.extension_bridge_url {
            Some(url) => match RpcClient::new(url.clone(), config.request_timeout()) {
                Ok(client) => ExtensionMode::Bridge(client),
                Err(err) => {
                    if config.strict_runtime_required() {
                        ExtensionMode::Disabled(format!(
                            "failed to initialize extension bridge client in production profile: {err}"
                        ))
                    } else {
                        ExtensionMode::Deterministic
                    }
                }
            },
            None => {
                if config.strict_runtime_required() {
                    ExtensionMode::Disabled(
                        "extension bridge URL not configured in production profile".to_owned(),
                    )
                } else {
                    ExtensionMode::Deterministic
                }
            }
        };

        Self {
            profile,
            mode,
            app_name: config.app_name.clone(),
            network: config.network,
            program_ids: config.program_ids.clone(),
            address: Arc::new(Mutex::new(None)),
        }
    }

    pub fn leo(config: &WalletAdapterConfig) -> Self {
        Self::new(ExtensionProfile::leo(), config)
    }

    pub fn fox(config: &WalletAdapterConfig) -> Self {
        Self::new(ExtensionProfile::fox(), config)
    }

    pub fn soter(config: &WalletAdapterConfig) -> Self {
        Self::new(ExtensionProfile::soter(), config)
    }

    fn check_mode(&self) -> Result<(), DriverError> {
        if let ExtensionMode::Disabled(reason) = &self.mode {
            return Err(DriverError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn address(&self) -> MutexGuard<'_, Option<String>> {
        match self.address.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn method(&self, name: &str) -> String {
        format!("{}_{name}", self.profile.rpc_namespace)
    }

    /// Network parameter as this extension spells it. Leo names the
    /// current testnet "testnetbeta" where the others use "testnet".
    fn network_param(&self) -> &'static str {
        match (self.profile.kind, self.network) {
            (WalletKind::Leo, WalletNetwork::Testnet) => "testnetbeta",
            (_, network) => network.wire_value(),
        }
    }

    fn deterministic_account(&self) -> ConnectedAccount {
        ConnectedAccount::new(offline::deterministic_address(self.profile.rpc_namespace))
    }

    /// Ask the injected extension object for its accounts without a
    /// connect prompt. Only worth trying for wallets that expose it.
    async fn direct_accounts(&self, client: &RpcClient) -> Option<ConnectedAccount> {
        let method = self.method("requestAccounts");
        match client.call(&method, serde_json::json!({})).await {
            Ok(result) => result
                .as_array()
                .and_then(|accounts| accounts.first())
                .and_then(Value::as_str)
                .map(ConnectedAccount::new),
            Err(err) => {
                debug!(wallet = self.profile.rpc_namespace, error = %err, "direct account query failed");
                None
            }
        }
    }

    async fn decrypt_one(&self, ciphertext: &str) -> Result<String, DriverError> {
        match &self.mode {
            ExtensionMode::Bridge(client) => {
                let method = self.method("decrypt");
                let result = client
                    .call(&method, serde_json::json!({ "ciphertext": ciphertext }))
                    .await?;
                result_string(&result, "plaintext", &method)
            }
            _ => {
                let owner = self.deterministic_account().address;
                Ok(offline::deterministic_plaintext(&owner, ciphertext))
            }
        }
    }

    async fn fetch_values(
        &self,
        rpc_name: &str,
        result_key: &str,
        program_id: &str,
        with_plaintext: bool,
    ) -> Result<Vec<Value>, DriverError> {
        self.check_mode()?;
        match &self.mode {
            ExtensionMode::Bridge(client) => {
                let method = self.method(rpc_name);
                let result = client
                    .call(&method, serde_json::json!({ "program": program_id }))
                    .await?;
                result_array(&result, result_key, &method)
            }
            _ => {
                let owner = self.deterministic_account().address;
                Ok(vec![
                    offline::deterministic_record(&owner, program_id, 0, with_plaintext),
                    offline::deterministic_record(&owner, program_id, 1, with_plaintext),
                ])
            }
        }
    }
}

#[async_trait]
impl WalletDriver for ExtensionDriver {
    fn kind(&self) -> WalletKind {
        self.profile.kind
    }

    async fn connect(
        &self,
        permission: DecryptPermission,
    ) -> Result<ConnectedAccount, DriverError> {
        self.check_mode()?;
        match &self.mode {
            ExtensionMode::Bridge(client) => {
                if self.profile.direct_account_probe {
                    if let Some(account) = self.direct_accounts(client).await {
                        *self.address() = Some(account.address.clone());
                        return Ok(account);
                    }
                }

                let method = self.method("connect");
                let params = serde_json::json!({
                    "appName": self.app_name,
                    "decryptPermission": permission,
                    "network": self.network_param(),
                    "programIds": self.program_ids,
                });
                let result = client.call(&method, params).await?;
                let address = result
                    .get("publicKey")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        DriverError::NotFound(format!(
                            "could not get {} public key",
                            self.profile.kind.display_name()
                        ))
                    })?;
                *self.address() = Some(address.to_owned());
                Ok(ConnectedAccount::new(address))
            }
            _ => {
                let account = self.deterministic_account();
                *self.address() = Some(account.address.clone());
                Ok(account)
            }
        }
    }

    async fn disconnect(&self) -> Result<(), DriverError> {
        self.check_mode()?;
        let outcome = match &self.mode {
            ExtensionMode::Bridge(client) => client
                .call(&self.method("disconnect"), serde_json::json!({}))
                .await
                .map(|_| ()),
            _ => Ok(()),
        };
        *self.address() = None;
        outcome
    }

    async fn create_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<String, DriverError> {
        self.check_mode()?;
        match &self.mode {
            ExtensionMode::Bridge(client) => {
                let address = self.address().clone().ok_or_else(|| {
                    DriverError::Validation("transaction requested before connect".to_owned())
                })?;
                let method = self.method("requestTransaction");
                let params = serde_json::json!({
                    "transaction": {
                        "address": address,
                        "network": self.network_param(),
                        "programId": request.program_id,
                        "functionName": request.function_name,
                        "inputs": request.inputs,
                        "fee": request.fee,
                        "feePrivate": false,
                    },
                });
                let result = client.call(&method, params).await?;
                result_string(&result, "transactionId", &method)
            }
            _ => {
                let inputs = serde_json::to_string(&request.inputs).unwrap_or_default();
                Ok(format!(
                    "at1{}",
                    offline::short_digest(&[
                        self.profile.rpc_namespace.as_bytes(),
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
            ExtensionMode::Bridge(client) => {
                let method = self.method("signMessage");
                let result = client
                    .call(&method, serde_json::json!({ "message": message }))
                    .await?;
                result_string(&result, "signature", &method)
            }
            _ => Ok(format!(
                "sign1{}",
                offline::short_digest(&[
                    self.profile.rpc_namespace.as_bytes(),
                    message.as_bytes(),
                ])
            )),
        }
    }

    /// Extensions decrypt one ciphertext per request; the first failure
    /// aborts the batch with nothing partial returned.
    async fn decrypt(&self, ciphertexts: &[String]) -> Result<Vec<String>, DriverError> {
        self.check_mode()?;
        let mut plaintexts = Vec::with_capacity(ciphertexts.len());
        for ciphertext in ciphertexts {
            plaintexts.push(self.decrypt_one(ciphertext).await?);
        }
        Ok(plaintexts)
    }

    async fn records(&self, query: &RecordQuery) -> Result<Vec<Value>, DriverError> {
        self.fetch_values("requestRecords", "records", &query.program_id, false)
            .await
    }

    async fn record_plaintexts(&self, query: &RecordQuery) -> Result<Vec<Value>, DriverError> {
        self.fetch_values(
            "requestRecordPlaintexts",
            "records",
            &query.program_id,
            true,
        )
        .await
    }

    async fn transaction_history(&self, query: &HistoryQuery) -> Result<Vec<Value>, DriverError> {
        self.check_mode()?;
        match &self.mode {
            ExtensionMode::Bridge(client) => {
                let method = self.method("requestTransactionHistory");
                let result = client
                    .call(&method, serde_json::json!({ "program": query.program_id }))
                    .await?;
                result_array(&result, "transactions", &method)
            }
            _ => Ok(vec![offline::deterministic_event(
                &query.program_id,
                query.function_id.as_deref(),
                0,
            )]),
        }
    }
}
