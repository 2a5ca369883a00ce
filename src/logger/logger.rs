use anyhow::{Result, anyhow};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const BOOTSTRAP_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
}

impl From<&crate::settings::Log> for LogConfig {
    fn from(log: &crate::settings::Log) -> Self {
        Self {
            filter: log.filter.clone(),
        }
    }
}

/// Global subscriber whose filter can be swapped once settings are known.
pub struct Logger {
    reload_handle: reload::Handle<EnvFilter, Registry>,
}

impl Logger {
    /// Installs the subscriber at `info`. Panics if one is already installed.
    pub fn new_bootstrap() -> Self {
        let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(BOOTSTRAP_FILTER));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();

        Self { reload_handle }
    }

    pub fn reload_from_config(&self, config: &LogConfig) -> Result<()> {
        let filter = EnvFilter::try_new(&config.filter)
            .map_err(|e| anyhow!("invalid log filter {:?}: {e}", config.filter))?;
        self.reload_handle.reload(filter).map_err(|e| anyhow!(e))?;
        Ok(())
    }
}
