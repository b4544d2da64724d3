use std::sync::Arc;

use crate::fleet::Fleet;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) fleet: Arc<Fleet>,
}
