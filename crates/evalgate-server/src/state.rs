//! Shared application state.

use std::sync::{Arc, RwLock};

use evalgate_core::{Config, Health};
use evalgate_provider::ProviderClient;

/// State handed to every request handler.
///
/// The client slot is `None` until startup validation (or a later
/// revalidation) installs a live handle; an empty slot makes every
/// evaluation short-circuit to the manual-review outcome. The lock is a
/// plain `std::sync::RwLock` and is never held across an await point —
/// readers clone the `Arc` out.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub health: Arc<Health>,
    client: Arc<RwLock<Option<Arc<ProviderClient>>>>,
}

impl AppState {
    /// Build state from loaded configuration. No provider contact happens
    /// here; the client slot starts empty.
    pub fn new(config: Config) -> Self {
        let health = Health::new(
            config.provider.enabled,
            config.provider.model.clone(),
            config.provider.name.clone(),
        );
        AppState {
            config: Arc::new(config),
            health: Arc::new(health),
            client: Arc::new(RwLock::new(None)),
        }
    }

    /// Current provider client handle, if one has been installed.
    pub fn client(&self) -> Option<Arc<ProviderClient>> {
        self.client.read().expect("client lock poisoned").clone()
    }

    /// Install (or clear) the provider client handle.
    pub fn set_client(&self, client: Option<Arc<ProviderClient>>) {
        *self.client.write().expect("client lock poisoned") = client;
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use evalgate_core::config::ProviderSettings;

    #[test]
    fn test_client_slot_starts_empty() {
        let state = AppState::new(Config::default());
        assert!(state.client().is_none());
    }

    #[test]
    fn test_install_and_clear_client() {
        let state = AppState::new(Config::default());
        let settings = ProviderSettings {
            api_key: "test-key".to_string(),
            ..Default::default()
        };
        let client = Arc::new(ProviderClient::new(&settings).unwrap());

        state.set_client(Some(client));
        assert!(state.client().is_some());

        state.set_client(None);
        assert!(state.client().is_none());
    }

    #[test]
    fn test_health_mirrors_config() {
        let mut config = Config::default();
        config.provider.enabled = false;
        config.provider.model = "gpt-4o".to_string();

        let state = AppState::new(config);
        let snap = state.health.snapshot();
        assert!(!snap.ai_enabled);
        assert_eq!(snap.model, "gpt-4o");
    }
}
