use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{
    ConnectedAccount, DecryptPermission, HistoryQuery, RecordQuery, TransactionRequest, WalletKind,
};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver call not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl DriverError {
    /// True for failures that mean the wallet is absent rather than
    /// unwilling; the hub turns these into an install hint.
    pub fn is_not_detected(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NotImplemented(_))
    }
}

/// Capability table for one wallet kind. The hub dispatches every
/// operation through this trait instead of branching on the kind.
#[async_trait]
pub trait WalletDriver: Send + Sync {
    fn kind(&self) -> WalletKind;

    /// Look for a session established before this process started.
    /// Extension wallets expose no such query; the default answers "none".
    async fn probe_session(&self) -> Result<Option<ConnectedAccount>, DriverError> {
        Ok(None)
    }

    async fn connect(
        &self,
        permission: DecryptPermission,
    ) -> Result<ConnectedAccount, DriverError>;

    async fn disconnect(&self) -> Result<(), DriverError>;

    /// Submit a program execution; returns the transaction id.
    async fn create_transaction(&self, request: &TransactionRequest)
        -> Result<String, DriverError>;

    async fn sign_message(&self, message: &str) -> Result<String, DriverError>;

    /// Decrypt a batch of record ciphertexts. Implementations backed by a
    /// one-ciphertext-at-a-time wallet must stop at the first failure and
    /// return it without any partial batch.
    async fn decrypt(&self, ciphertexts: &[String]) -> Result<Vec<String>, DriverError>;

    async fn records(&self, query: &RecordQuery) -> Result<Vec<Value>, DriverError>;

    async fn record_plaintexts(&self, query: &RecordQuery) -> Result<Vec<Value>, DriverError>;

    async fn transaction_history(&self, query: &HistoryQuery) -> Result<Vec<Value>, DriverError>;
}
