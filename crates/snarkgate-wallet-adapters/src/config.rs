use std::time::Duration;

use snarkgate_wallet_core::WalletNetwork;

/// Deployment profile. Production refuses to fall back to the
/// deterministic offline drivers when endpoints are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeProfile {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct WalletAdapterConfig {
    pub app_name: String,
    pub app_description: String,
    pub network: WalletNetwork,
    /// Programs the connect request asks permission for.
    pub program_ids: Vec<String>,
    pub hosted_service_url: Option<String>,
    pub extension_bridge_url: Option<String>,
    pub request_timeout_ms: u64,
    pub profile: RuntimeProfile,
}

impl Default for WalletAdapterConfig {
    fn default() -> Self {
        Self {
            app_name: "Snarkgate".to_owned(),
            app_description: "Snarkgate wallet hub".to_owned(),
            network: WalletNetwork::Testnet,
            program_ids: vec!["credits.aleo".to_owned()],
            hosted_service_url: None,
            extension_bridge_url: None,
            request_timeout_ms: 15_000,
            profile: RuntimeProfile::Development,
        }
    }
}

impl WalletAdapterConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(name) = std::env::var("SNARKGATE_APP_NAME") {
            config.app_name = name;
        }
        if let Ok(description) = std::env::var("SNARKGATE_APP_DESCRIPTION") {
            config.app_description = description;
        }
        if let Ok(url) = std::env::var("SNARKGATE_HOSTED_SERVICE_URL") {
            config.hosted_service_url = Some(url);
        }
        if let Ok(url) = std::env::var("SNARKGATE_EXTENSION_BRIDGE_URL") {
            config.extension_bridge_url = Some(url);
        }
        if let Ok(raw) = std::env::var("SNARKGATE_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = raw.parse() {
                config.request_timeout_ms = ms;
            }
        }
        if let Ok(raw) = std::env::var("SNARKGATE_NETWORK") {
            if raw.eq_ignore_ascii_case("mainnet") {
                config.network = WalletNetwork::Mainnet;
            }
        }
        if let Ok(raw) = std::env::var("SNARKGATE_PROFILE") {
            if raw.eq_ignore_ascii_case("production") {
                config.profile = RuntimeProfile::Production;
            }
        }
        if let Ok(raw) = std::env::var("SNARKGATE_PROGRAM_IDS") {
            let ids: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
            if !ids.is_empty() {
                config.program_ids = ids;
            }
        }
        config
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.profile == RuntimeProfile::Production
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
