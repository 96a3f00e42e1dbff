use std::sync::Arc;

use crate::app::Result;
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::monitor::Monitor;
use crate::normalizer::Normalizer;
use crate::notifier::{FeishuNotifier, Notifier};
use crate::store::{JsonStore, Store};

/// Wires the pipeline together from one [`Config`].
pub struct AppContext {
    pub config: Config,
    pub store: Arc<JsonStore>,
    pub monitor: Monitor,
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.fetch)?);
        let notifier = FeishuNotifier::from_config(&config.notify)?
            .map(|n| Arc::new(n) as Arc<dyn Notifier>);
        Ok(Self::with_parts(config, fetcher, notifier))
    }

    /// Build a context around an existing fetcher and notifier.
    pub fn with_parts(
        config: Config,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let store = Arc::new(JsonStore::new(&config.storage.dir));
        let monitor = Monitor::new(
            fetcher,
            store.clone() as Arc<dyn Store + Send + Sync>,
            Normalizer::new(),
        );

        Self {
            config,
            store,
            monitor,
            notifier,
        }
    }
}
