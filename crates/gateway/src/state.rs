use std::sync::Arc;

use chanstat_collector::{ChannelProcessor, ChannelStore, CollectionScheduler};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChannelStore>,
    pub scheduler: Arc<CollectionScheduler>,
}

impl AppState {
    pub fn new(store: Arc<dyn ChannelStore>, scheduler: Arc<CollectionScheduler>) -> Self {
        Self { store, scheduler }
    }

    pub fn processor(&self) -> &Arc<ChannelProcessor> {
        self.scheduler.processor()
    }
}
