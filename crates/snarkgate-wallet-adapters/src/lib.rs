pub mod config;
pub mod extension;
pub mod hosted;
pub mod transport;

mod offline;

pub use config::{RuntimeProfile, WalletAdapterConfig};
pub use extension::{ExtensionDriver, ExtensionProfile};
pub use hosted::HostedDriver;
pub use transport::RpcClient;

use std::sync::Arc;

use snarkgate_wallet_core::WalletDriver;

/// The full driver set for a hub, one per supported wallet kind.
pub fn default_drivers(config: &WalletAdapterConfig) -> Vec<Arc<dyn WalletDriver>> {
    vec![
        Arc::new(HostedDriver::new(config)),
        Arc::new(ExtensionDriver::leo(config)),
        Arc::new(ExtensionDriver::fox(config)),
        Arc::new(ExtensionDriver::soter(config)),
    ]
}
