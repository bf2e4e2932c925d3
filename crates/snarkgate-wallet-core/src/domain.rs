use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimestampMs(pub u64);

impl TimestampMs {
    pub fn now() -> Self {
        let ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(ms)
    }
}

/// The four wallet integrations the hub can dispatch to. Puzzle is the
/// hosted-service kind; the other three are browser-extension wallets
/// reached through their adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletKind {
    Puzzle,
    Leo,
    Fox,
    Soter,
}

impl WalletKind {
    pub const ALL: [WalletKind; 4] = [Self::Puzzle, Self::Leo, Self::Fox, Self::Soter];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Puzzle => "Puzzle Wallet",
            Self::Leo => "Leo Wallet",
            Self::Fox => "Fox Wallet",
            Self::Soter => "Soter Wallet",
        }
    }

    pub fn is_hosted(self) -> bool {
        matches!(self, Self::Puzzle)
    }
}

impl std::fmt::Display for WalletKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Authorization scope requested at connect time. Plaintext and history
/// queries require `OnChainHistory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecryptPermission {
    NoDecrypt,
    DecryptUponRequest,
    AutoDecrypt,
    OnChainHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletNetwork {
    Testnet,
    Mainnet,
}

impl WalletNetwork {
    pub fn wire_value(self) -> &'static str {
        match self {
            Self::Testnet => "testnet",
            Self::Mainnet => "mainnet",
        }
    }
}

/// Account handed back by a wallet on connect or session probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    pub address: String,
}

impl ConnectedAccount {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub program_id: String,
    pub function_name: String,
    pub inputs: Vec<Value>,
    /// Fee in microcredits.
    pub fee: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Unspent,
    Spent,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQuery {
    pub program_id: String,
    pub status: Option<RecordStatus>,
}

impl RecordQuery {
    pub fn for_program(program_id: impl Into<String>) -> Self {
        Self {
            program_id: program_id.into(),
            status: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Execute,
    Deploy,
    Send,
    Receive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub program_id: String,
    pub event_kind: Option<EventKind>,
    pub function_id: Option<String>,
}

impl HistoryQuery {
    pub fn for_program(program_id: impl Into<String>) -> Self {
        Self {
            program_id: program_id.into(),
            event_kind: None,
            function_id: None,
        }
    }
}
