use std::sync::Arc;

use crate::access::Role;
use crate::auth;
use crate::config;
use crate::store::{NewUser, Store};
use crate::validation::SchemaRegistry;

/// Shared router state: the store plus the schema registry built in `main`.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Store,
    pub registry: Arc<SchemaRegistry>,
}

impl AppState {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            store: Store::new(),
            registry: Arc::new(registry),
        }
    }

    /// Seeds the bootstrap SUPERADMIN account. Registration only ever
    /// produces USER-role accounts, so without this seed the upper tiers
    /// would be unreachable. Skipped when the account already exists or no
    /// password is configured.
    pub fn seed_bootstrap_admin(&self) {
        let bootstrap = &config::config().bootstrap;
        if bootstrap.admin_password.is_empty() {
            tracing::warn!("bootstrap admin password not configured, skipping SUPERADMIN seed");
            return;
        }
        if self
            .store
            .find_user_by_username(&bootstrap.admin_username)
            .is_some()
        {
            return;
        }

        let salt = auth::generate_salt();
        let password_hash = auth::hash_password(&bootstrap.admin_password, &salt);
        match self.store.create_user(NewUser {
            username: bootstrap.admin_username.clone(),
            email: bootstrap.admin_email.clone(),
            password_hash,
            salt,
            role: Role::Superadmin,
        }) {
            Ok(user) => tracing::info!("seeded bootstrap SUPERADMIN '{}'", user.username),
            Err(e) => tracing::error!("failed to seed bootstrap SUPERADMIN: {}", e),
        }
    }
}
