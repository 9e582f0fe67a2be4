use crate::mailer::Mailer;
use crate::store::KvStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KvStore>,
    pub mailer: Arc<dyn Mailer>,
}
