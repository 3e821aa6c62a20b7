use std::sync::Arc;

use graphsplit_store::Store;

/// Shared by every handler; the store is the only state.
pub struct AppState<S: Store> {
    pub store: Arc<S>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}
