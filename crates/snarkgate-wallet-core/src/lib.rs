pub mod domain;
pub mod driver;
pub mod hub;
pub mod log;
pub mod retry;

pub use domain::{
    ConnectedAccount, DecryptPermission, EventKind, HistoryQuery, RecordQuery, RecordStatus,
    TimestampMs, TransactionRequest, WalletKind, WalletNetwork,
};
pub use driver::{DriverError, WalletDriver};
pub use hub::{
    HubSnapshot, LastResults, OperationError, PendingFlags, Session, WalletHub, WalletHubBuilder,
};
pub use log::{ActivityLog, LogEntry, LOG_CAPACITY};
pub use retry::{run_with_retry, Attempt, RetryPolicy};
