use std::sync::Arc;

use crate::application::services::UserService;
use crate::auth::Authenticator;
use crate::metrics::Metrics;

/// Shared dependencies handed to handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub authenticator: Arc<Authenticator>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        users: Arc<UserService>,
        authenticator: Arc<Authenticator>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            users,
            authenticator,
            metrics,
        }
    }
}
