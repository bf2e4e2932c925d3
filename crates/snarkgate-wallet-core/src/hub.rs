use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{
    ConnectedAccount, DecryptPermission, HistoryQuery, RecordQuery, TransactionRequest, WalletKind,
};
use crate::driver::{DriverError, WalletDriver};
use crate::log::{ActivityLog, LogEntry};
use crate::retry::{run_with_retry, Attempt, RetryPolicy};

/// Normalized failure shape every hub operation resolves to. Driver
/// failures are recovered here; nothing propagates as a panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("Wallet not connected")]
    NotConnected,
    #[error("{operation} not supported for this wallet type")]
    Unsupported { operation: &'static str },
    #[error("No ciphertexts provided")]
    EmptyInput,
    #[error("{0}")]
    External(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Transaction,
    Signature,
    Decrypt,
    Records,
    RecordPlaintexts,
    History,
}

impl Operation {
    fn label(self) -> &'static str {
        match self {
            Self::Transaction => "Transaction",
            Self::Signature => "Signature",
            Self::Decrypt => "Decryption",
            Self::Records => "Records",
            Self::RecordPlaintexts => "Record plaintexts",
            Self::History => "Transaction history",
        }
    }
}

/// One boolean per in-flight request category, true only while the
/// corresponding external call is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingFlags {
    pub connecting: bool,
    pub transaction: bool,
    pub signature: bool,
    pub decrypt: bool,
    pub records: bool,
    pub record_plaintexts: bool,
    pub history: bool,
}

/// Most recent successful payload per operation category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LastResults {
    pub transaction_id: Option<String>,
    pub signature: Option<String>,
    pub decrypted_texts: Option<Vec<String>>,
    pub records: Option<Vec<Value>>,
    pub record_plaintexts: Option<Vec<Value>>,
    pub transaction_history: Option<Vec<Value>>,
}

/// Active wallet binding. The driver handle is the opaque reference the
/// dispatcher calls through; at most one session exists at a time.
#[derive(Clone)]
pub struct Session {
    pub kind: WalletKind,
    pub address: String,
    driver: Arc<dyn WalletDriver>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("kind", &self.kind)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct HubState {
    session: Option<Session>,
    pending: PendingFlags,
    last: LastResults,
    error_message: Option<String>,
    log: ActivityLog,
}

/// Read-only view of the hub for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct HubSnapshot {
    pub connected: bool,
    pub connecting: bool,
    pub wallet_kind: Option<WalletKind>,
    pub wallet_name: Option<&'static str>,
    pub address: Option<String>,
    pub pending: PendingFlags,
    pub last: LastResults,
    pub error_message: Option<String>,
    pub log: Vec<LogEntry>,
}

#[derive(Default)]
pub struct WalletHubBuilder {
    drivers: HashMap<WalletKind, Arc<dyn WalletDriver>>,
    retry: Option<RetryPolicy>,
}

impl WalletHubBuilder {
    pub fn driver(mut self, driver: Arc<dyn WalletDriver>) -> Self {
        self.drivers.insert(driver.kind(), driver);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn build(self) -> WalletHub {
        WalletHub {
            drivers: self.drivers,
            retry: self.retry.unwrap_or_default(),
            state: Mutex::new(HubState::default()),
        }
    }
}

/// Connection manager and operation dispatcher over the registered wallet
/// drivers. All shared state lives behind the internal mutex and is
/// exposed to consumers as cloned snapshots; the lock is never held
/// across an await.
pub struct WalletHub {
    drivers: HashMap<WalletKind, Arc<dyn WalletDriver>>,
    retry: RetryPolicy,
    state: Mutex<HubState>,
}

impl WalletHub {
    pub fn builder() -> WalletHubBuilder {
        WalletHubBuilder::default()
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, event: impl Into<String>) {
        self.state().log.push(event);
    }

    fn record_with_payload(&self, event: impl Into<String>, payload: Option<Value>) {
        self.state().log.push_with_payload(event, payload);
    }

    // --- read-only accessors ------------------------------------------------

    pub fn connected(&self) -> bool {
        self.state().session.is_some()
    }

    pub fn connecting(&self) -> bool {
        self.state().pending.connecting
    }

    pub fn wallet_kind(&self) -> Option<WalletKind> {
        self.state().session.as_ref().map(|s| s.kind)
    }

    pub fn wallet_name(&self) -> Option<&'static str> {
        self.wallet_kind().map(WalletKind::display_name)
    }

    pub fn address(&self) -> Option<String> {
        self.state().session.as_ref().map(|s| s.address.clone())
    }

    pub fn error_message(&self) -> Option<String> {
        self.state().error_message.clone()
    }

    pub fn pending(&self) -> PendingFlags {
        self.state().pending
    }

    pub fn last_results(&self) -> LastResults {
        self.state().last.clone()
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.state().log.to_vec()
    }

    pub fn snapshot(&self) -> HubSnapshot {
        let state = self.state();
        HubSnapshot {
            connected: state.session.is_some(),
            connecting: state.pending.connecting,
            wallet_kind: state.session.as_ref().map(|s| s.kind),
            wallet_name: state.session.as_ref().map(|s| s.kind.display_name()),
            address: state.session.as_ref().map(|s| s.address.clone()),
            pending: state.pending,
            last: state.last.clone(),
            error_message: state.error_message.clone(),
            log: state.log.to_vec(),
        }
    }

    // --- connection manager -------------------------------------------------

    /// Connect the given wallet kind. Failures never escape: they set the
    /// user-facing error message and land in the activity log.
    pub async fn connect(&self, kind: WalletKind) {
        let Some(driver) = self.drivers.get(&kind).map(Arc::clone) else {
            let message = format!("{} error: no driver registered", kind.display_name());
            let mut state = self.state();
            state.error_message = Some(message.clone());
            state.log.push(message);
            return;
        };

        self.state().error_message = None;
        let _pending = PendingGuard::connecting(self);
        self.record(format!("Connecting to {}...", kind.display_name()));

        let outcome = if kind.is_hosted() {
            self.connect_hosted(&driver).await
        } else {
            self.connect_extension(&driver).await
        };

        match outcome {
            Ok(account) => self.install_session(kind, driver, account),
            Err(err) => self.fail_connect(kind, &err),
        }
    }

    /// Hosted connect: probe for an existing session first, then issue
    /// connect requests under the bounded retry policy, with one final
    /// probe after the settle delay.
    async fn connect_hosted(
        &self,
        driver: &Arc<dyn WalletDriver>,
    ) -> Result<ConnectedAccount, DriverError> {
        match driver.probe_session().await {
            Ok(Some(account)) => {
                self.record_with_payload(
                    format!("Already connected to {}", driver.kind().display_name()),
                    serde_json::to_value(&account).ok(),
                );
                return Ok(account);
            }
            Ok(None) => self.record("No existing connection, proceeding with connect"),
            Err(err) => {
                debug!(error = %err, "hosted session probe failed");
                self.record("No existing connection, proceeding with connect");
            }
        }

        let this = self;
        let driver_for_attempts = Arc::clone(driver);
        run_with_retry(self.retry, move |attempt| {
            let driver = Arc::clone(&driver_for_attempts);
            Box::pin(async move {
                match attempt {
                    Attempt::Numbered { number, of } => {
                        this.record(format!("Connection attempt {number}/{of}"));
                        match driver.connect(DecryptPermission::OnChainHistory).await {
                            Ok(account) => Ok(account),
                            Err(err) => {
                                this.record(format!("Connection attempt {number} failed: {err}"));
                                Err(err)
                            }
                        }
                    }
                    Attempt::Final => {
                        this.record(
                            "All connection attempts appeared to fail. \
                             Checking one last time after delay...",
                        );
                        match driver.probe_session().await? {
                            Some(account) => {
                                this.record("Connection detected after delay!");
                                Ok(account)
                            }
                            None => Err(DriverError::NotFound(
                                "no hosted session after final delay".to_owned(),
                            )),
                        }
                    }
                }
            })
        })
        .await
    }

    /// Extension connect is one-shot: the adapters prompt the user on
    /// every connect and expose no pre-existing-session query.
    async fn connect_extension(
        &self,
        driver: &Arc<dyn WalletDriver>,
    ) -> Result<ConnectedAccount, DriverError> {
        let outcome = driver.connect(DecryptPermission::OnChainHistory).await;
        if let Err(ref err) = outcome {
            if err.is_not_detected() {
                self.record(format!(
                    "Make sure {} is installed and unlocked",
                    driver.kind().display_name()
                ));
            }
        }
        outcome
    }

    /// Probe the hosted wallet for a session established before this
    /// process started, under the same retry policy as connect, so a
    /// restart does not require an explicit connect.
    pub async fn restore_session(&self) {
        let Some(driver) = self
            .drivers
            .values()
            .find(|d| d.kind().is_hosted())
            .map(Arc::clone)
        else {
            return;
        };

        let _pending = PendingGuard::connecting(self);
        let this = self;
        let driver_for_attempts = Arc::clone(&driver);
        let outcome = run_with_retry(self.retry, move |attempt| {
            let driver = Arc::clone(&driver_for_attempts);
            Box::pin(async move {
                if let Attempt::Numbered { number, of } = attempt {
                    this.record(format!("Connection attempt {number}/{of}"));
                } else {
                    this.record(
                        "All connection attempts appeared to fail. \
                         Checking one last time after delay...",
                    );
                }
                match driver.probe_session().await {
                    Ok(Some(account)) => Ok(account),
                    Ok(None) => Err(DriverError::NotFound(
                        "no existing hosted session".to_owned(),
                    )),
                    Err(err) => {
                        if let Attempt::Numbered { number, .. } = attempt {
                            this.record(format!("Connection attempt {number} failed: {err}"));
                        }
                        Err(err)
                    }
                }
            })
        })
        .await;

        match outcome {
            Ok(account) => {
                let kind = driver.kind();
                self.record_with_payload(
                    "Connection detected!",
                    serde_json::to_value(&account).ok(),
                );
                self.install_session(kind, driver, account);
            }
            Err(err) => {
                debug!(error = %err, "no hosted session restored");
            }
        }
    }

    /// Best-effort driver disconnect, then unconditional reset of the
    /// session and every last-result cache.
    pub async fn disconnect(&self) {
        let session = self.state().session.clone();
        self.state().error_message = None;
        self.record("Disconnecting from wallet...");

        if let Some(session) = session {
            if let Err(err) = session.driver.disconnect().await {
                debug!(error = %err, "driver disconnect failed; clearing session anyway");
            }
        }

        let mut state = self.state();
        state.session = None;
        state.last = LastResults::default();
        state.log.push("Disconnected successfully");
    }

    fn install_session(&self, kind: WalletKind, driver: Arc<dyn WalletDriver>, account: ConnectedAccount) {
        debug!(wallet = kind.display_name(), address = %account.address, "wallet connected");
        let mut state = self.state();
        state.log.push_with_payload(
            format!("Connected successfully to {}", kind.display_name()),
            serde_json::to_value(&account).ok(),
        );
        state.session = Some(Session {
            kind,
            address: account.address,
            driver,
        });
    }

    fn fail_connect(&self, kind: WalletKind, err: &DriverError) {
        warn!(wallet = kind.display_name(), error = %err, "wallet connect failed");
        let mut state = self.state();
        state.error_message = Some(format!("{} error: {err}", kind.display_name()));
        state
            .log
            .push(format!("{} connection error: {err}", kind.display_name()));
    }

    // --- operation dispatcher -----------------------------------------------

    pub async fn create_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<String, OperationError> {
        let session = self.require_session()?;
        let _pending = self.begin_operation(Operation::Transaction);
        self.record(format!(
            "Creating transaction for {}.{} with fee {}",
            request.program_id, request.function_name, request.fee
        ));
        match session.driver.create_transaction(&request).await {
            Ok(transaction_id) => {
                let mut state = self.state();
                state.last.transaction_id = Some(transaction_id.clone());
                state.log.push(format!(
                    "{} transaction created successfully with ID: {transaction_id}",
                    session.kind.display_name()
                ));
                Ok(transaction_id)
            }
            Err(err) => Err(self.fail_operation(Operation::Transaction, err)),
        }
    }

    pub async fn sign_message(&self, message: &str) -> Result<String, OperationError> {
        let session = self.require_session()?;
        let _pending = self.begin_operation(Operation::Signature);
        self.record(format!("Signing message: \"{message}\""));
        match session.driver.sign_message(message).await {
            Ok(signature) => {
                let mut state = self.state();
                state.last.signature = Some(signature.clone());
                state.log.push(format!(
                    "{} signature created successfully",
                    session.kind.display_name()
                ));
                Ok(signature)
            }
            Err(err) => Err(self.fail_operation(Operation::Signature, err)),
        }
    }

    /// Decrypt record ciphertexts through the active wallet. A failure
    /// anywhere in the batch yields an error result, never a partial
    /// payload.
    pub async fn decrypt(&self, ciphertexts: &[String]) -> Result<Vec<String>, OperationError> {
        let session = self.require_session()?;
        if ciphertexts.is_empty() {
            return Err(OperationError::EmptyInput);
        }
        let _pending = self.begin_operation(Operation::Decrypt);
        self.record(format!("Decrypting {} ciphertext(s)", ciphertexts.len()));
        match session.driver.decrypt(ciphertexts).await {
            Ok(plaintexts) => {
                let mut state = self.state();
                state.last.decrypted_texts = Some(plaintexts.clone());
                state.log.push(format!(
                    "{} decryption successful for {} ciphertext(s)",
                    session.kind.display_name(),
                    plaintexts.len()
                ));
                Ok(plaintexts)
            }
            Err(err) => Err(self.fail_operation(Operation::Decrypt, err)),
        }
    }

    pub async fn get_records(&self, query: RecordQuery) -> Result<Vec<Value>, OperationError> {
        let session = self.require_session()?;
        let _pending = self.begin_operation(Operation::Records);
        self.record(format!("Requesting records for program {}", query.program_id));
        match session.driver.records(&query).await {
            Ok(records) => {
                let mut state = self.state();
                state.last.records = Some(records.clone());
                state.log.push(format!(
                    "{} records fetched successfully: {} records found",
                    session.kind.display_name(),
                    records.len()
                ));
                Ok(records)
            }
            Err(err) => Err(self.fail_operation(Operation::Records, err)),
        }
    }

    pub async fn get_record_plaintexts(
        &self,
        query: RecordQuery,
    ) -> Result<Vec<Value>, OperationError> {
        let session = self.require_session()?;
        let _pending = self.begin_operation(Operation::RecordPlaintexts);
        self.record(format!(
            "Requesting record plaintexts for program {}",
            query.program_id
        ));
        match session.driver.record_plaintexts(&query).await {
            Ok(records) => {
                let mut state = self.state();
                state.last.record_plaintexts = Some(records.clone());
                state.log.push(format!(
                    "{} record plaintexts fetched successfully: {} records found",
                    session.kind.display_name(),
                    records.len()
                ));
                Ok(records)
            }
            Err(err) => Err(self.fail_operation(Operation::RecordPlaintexts, err)),
        }
    }

    pub async fn get_transaction_history(
        &self,
        query: HistoryQuery,
    ) -> Result<Vec<Value>, OperationError> {
        let session = self.require_session()?;
        let _pending = self.begin_operation(Operation::History);
        self.record(format!(
            "Requesting transaction history for program {}",
            query.program_id
        ));
        match session.driver.transaction_history(&query).await {
            Ok(transactions) => {
                let mut state = self.state();
                state.last.transaction_history = Some(transactions.clone());
                state.log.push(format!(
                    "{} transaction history fetched successfully: {} transactions found",
                    session.kind.display_name(),
                    transactions.len()
                ));
                Ok(transactions)
            }
            Err(err) => Err(self.fail_operation(Operation::History, err)),
        }
    }

    // --- shared operation plumbing ------------------------------------------

    fn require_session(&self) -> Result<Session, OperationError> {
        self.state()
            .session
            .clone()
            .ok_or(OperationError::NotConnected)
    }

    fn begin_operation(&self, operation: Operation) -> PendingGuard<'_> {
        self.state().error_message = None;
        PendingGuard::operation(self, operation)
    }

    fn fail_operation(&self, operation: Operation, err: DriverError) -> OperationError {
        let normalized = match err {
            DriverError::NotImplemented(_) => OperationError::Unsupported {
                operation: operation.label(),
            },
            other => OperationError::External(other.to_string()),
        };
        warn!(operation = operation.label(), error = %normalized, "wallet operation failed");
        let mut state = self.state();
        state.error_message = Some(format!("{} error: {normalized}", operation.label()));
        state
            .log
            .push(format!("{} error: {normalized}", operation.label()));
        normalized
    }

    fn set_pending(&self, operation: Option<Operation>, value: bool) {
        let mut state = self.state();
        match operation {
            None => state.pending.connecting = value,
            Some(Operation::Transaction) => state.pending.transaction = value,
            Some(Operation::Signature) => state.pending.signature = value,
            Some(Operation::Decrypt) => state.pending.decrypt = value,
            Some(Operation::Records) => state.pending.records = value,
            Some(Operation::RecordPlaintexts) => state.pending.record_plaintexts = value,
            Some(Operation::History) => state.pending.history = value,
        }
    }
}

/// Clears its pending flag on every exit path, including drops from a
/// cancelled future.
struct PendingGuard<'a> {
    hub: &'a WalletHub,
    operation: Option<Operation>,
}

impl<'a> PendingGuard<'a> {
    fn connecting(hub: &'a WalletHub) -> Self {
        hub.set_pending(None, true);
        Self {
            hub,
            operation: None,
        }
    }

    fn operation(hub: &'a WalletHub, operation: Operation) -> Self {
        hub.set_pending(Some(operation), true);
        Self {
            hub,
            operation: Some(operation),
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.hub.set_pending(self.operation, false);
    }
}
