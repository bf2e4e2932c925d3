#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use snarkgate_wallet_core::{
    ConnectedAccount, DecryptPermission, DriverError, HistoryQuery, RecordQuery, RetryPolicy,
    TransactionRequest, WalletDriver, WalletHub, WalletKind,
};

/// Two-sided gate for observing an operation mid-flight: the driver
/// signals `entered` and parks on `release`.
#[derive(Default)]
pub struct OpGate {
    pub entered: Notify,
    pub release: Notify,
}

impl OpGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// Scriptable in-memory driver standing in for a wallet backend.
pub struct MockDriver {
    kind: WalletKind,
    address: String,
    transaction_id: String,
    connect_script: Mutex<VecDeque<Result<(), String>>>,
    probe_script: Mutex<VecDeque<Option<String>>>,
    connect_not_detected: bool,
    fail_disconnect: bool,
    fail_next_op: Mutex<Option<String>>,
    unsupported: bool,
    decrypt_fail_at: Option<usize>,
    gate: Option<Arc<OpGate>>,
    pub connect_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
    pub decrypt_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MockDriver {
    pub fn new(kind: WalletKind) -> Self {
        Self {
            kind,
            address: "aleo1mockaddress".to_owned(),
            transaction_id: "at1mocktx".to_owned(),
            connect_script: Mutex::new(VecDeque::new()),
            probe_script: Mutex::new(VecDeque::new()),
            connect_not_detected: false,
            fail_disconnect: false,
            fail_next_op: Mutex::new(None),
            unsupported: false,
            decrypt_fail_at: None,
            gate: None,
            connect_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
        }
    }

    pub fn hosted() -> Self {
        Self::new(WalletKind::Puzzle)
    }

    pub fn extension() -> Self {
        Self::new(WalletKind::Leo)
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = address.to_owned();
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: &str) -> Self {
        self.transaction_id = transaction_id.to_owned();
        self
    }

    /// Script `count` connect failures before connects start succeeding.
    pub fn connect_failures(self, count: usize) -> Self {
        for _ in 0..count {
            lock(&self.connect_script).push_back(Err("simulated connect failure".to_owned()));
        }
        self
    }

    pub fn connect_not_detected(mut self) -> Self {
        self.connect_not_detected = true;
        self
    }

    /// Script probe answers in order; an exhausted script answers "none".
    pub fn probe_outcomes(self, outcomes: &[Option<&str>]) -> Self {
        for outcome in outcomes.iter().copied() {
            lock(&self.probe_script).push_back(outcome.map(str::to_owned));
        }
        self
    }

    pub fn probe_finds_session(self) -> Self {
        let address = self.address.clone();
        lock(&self.probe_script).push_back(Some(address));
        self
    }

    pub fn fail_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    pub fn fail_next_operation(self, message: &str) -> Self {
        self.set_fail_next_operation(message);
        self
    }

    pub fn set_fail_next_operation(&self, message: &str) {
        *lock(&self.fail_next_op) = Some(message.to_owned());
    }

    pub fn unsupported_operations(mut self) -> Self {
        self.unsupported = true;
        self
    }

    pub fn fail_decrypt_at(mut self, index: usize) -> Self {
        self.decrypt_fail_at = Some(index);
        self
    }

    pub fn gated(mut self, gate: Arc<OpGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn account(&self) -> ConnectedAccount {
        ConnectedAccount::new(self.address.clone())
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }

    fn take_failure(&self) -> Option<DriverError> {
        if self.unsupported {
            return Some(DriverError::NotImplemented("mock operation"));
        }
        lock(&self.fail_next_op).take().map(DriverError::Transport)
    }
}

#[async_trait]
impl WalletDriver for MockDriver {
    fn kind(&self) -> WalletKind {
        self.kind
    }

    async fn probe_session(&self) -> Result<Option<ConnectedAccount>, DriverError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = lock(&self.probe_script).pop_front();
        Ok(scripted.flatten().map(ConnectedAccount::new))
    }

    async fn connect(
        &self,
        _permission: DecryptPermission,
    ) -> Result<ConnectedAccount, DriverError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        if self.connect_not_detected {
            return Err(DriverError::NotFound("extension not detected".to_owned()));
        }
        match lock(&self.connect_script).pop_front() {
            Some(Err(message)) => Err(DriverError::Transport(message)),
            _ => Ok(self.account()),
        }
    }

    async fn disconnect(&self) -> Result<(), DriverError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect {
            Err(DriverError::Transport(
                "simulated disconnect failure".to_owned(),
            ))
        } else {
            Ok(())
        }
    }

    async fn create_transaction(
        &self,
        _request: &TransactionRequest,
    ) -> Result<String, DriverError> {
        self.pass_gate().await;
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(self.transaction_id.clone())
    }

    async fn sign_message(&self, message: &str) -> Result<String, DriverError> {
        self.pass_gate().await;
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(format!("sign1{message}"))
    }

    async fn decrypt(&self, ciphertexts: &[String]) -> Result<Vec<String>, DriverError> {
        self.pass_gate().await;
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        // One ciphertext per underlying request; first failure aborts.
        let mut plaintexts = Vec::new();
        for (index, ciphertext) in ciphertexts.iter().enumerate() {
            self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
            if self.decrypt_fail_at == Some(index) {
                return Err(DriverError::Transport(format!(
                    "cannot decrypt ciphertext {index}"
                )));
            }
            plaintexts.push(format!("plain({ciphertext})"));
        }
        Ok(plaintexts)
    }

    async fn records(&self, query: &RecordQuery) -> Result<Vec<Value>, DriverError> {
        self.pass_gate().await;
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(vec![serde_json::json!({
            "program_id": query.program_id,
            "spent": false,
        })])
    }

    async fn record_plaintexts(&self, query: &RecordQuery) -> Result<Vec<Value>, DriverError> {
        self.pass_gate().await;
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(vec![serde_json::json!({
            "program_id": query.program_id,
            "plaintext": "{ owner: aleo1mockaddress.private }",
        })])
    }

    async fn transaction_history(&self, query: &HistoryQuery) -> Result<Vec<Value>, DriverError> {
        self.pass_gate().await;
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(vec![serde_json::json!({
            "programId": query.program_id,
            "type": "Execute",
        })])
    }
}

/// Retry policy with millisecond delays so retry paths stay fast in tests.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        attempt_delay: Duration::from_millis(5),
        final_delay: Duration::from_millis(10),
    }
}

pub fn hub_with_shared(driver: &Arc<MockDriver>) -> WalletHub {
    let dyn_driver: Arc<dyn WalletDriver> = driver.clone();
    WalletHub::builder()
        .retry_policy(fast_retry())
        .driver(dyn_driver)
        .build()
}

pub fn hub_with(driver: MockDriver) -> WalletHub {
    hub_with_shared(&Arc::new(driver))
}

pub async fn connected_hub(driver: MockDriver) -> WalletHub {
    let kind = driver.kind();
    let hub = hub_with(driver);
    hub.connect(kind).await;
    assert!(hub.connected(), "mock connect should succeed");
    hub
}

pub fn sample_transaction() -> TransactionRequest {
    TransactionRequest {
        program_id: "credits.aleo".to_owned(),
        function_name: "transfer_public".to_owned(),
        inputs: vec![
            serde_json::json!("aleo1mockaddress"),
            serde_json::json!("1000000u64"),
        ],
        fee: 3_000,
    }
}
