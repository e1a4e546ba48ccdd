use std::sync::Arc;

use crate::auth::{CredentialError, CredentialStore};
use crate::config::AppConfig;
use crate::database::Store;
use crate::middleware::AuthGate;
use crate::services::{ImageAvatarProcessor, TaskService, UserService};

/// Shared handler state. Everything inside is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub gate: AuthGate,
    pub users: UserService,
    pub tasks: TaskService,
}

impl AppState {
    /// Wires the services over `store`. Fails only if the signing secret
    /// is unusable.
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Result<Self, CredentialError> {
        let credentials = Arc::new(CredentialStore::new(&config.security)?);
        let avatars = Arc::new(ImageAvatarProcessor::new(&config.avatar));

        Ok(Self {
            gate: AuthGate::new(store.clone(), credentials.clone()),
            users: UserService::new(store.clone(), credentials, avatars),
            tasks: TaskService::new(store.clone(), config.filter.max_limit),
            store,
            config: Arc::new(config),
        })
    }
}
