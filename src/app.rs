//! Main application logic for OnTop

use anyhow::Result;
use log::{info, warn};

use crate::config::{Config, ConfigWatcher, SharedConfig};
use crate::shutdown::{self, ShutdownSignal};
use crate::topmost::AlwaysOnTopService;

/// Main application state
pub struct Application {
    config: SharedConfig,
    service: AlwaysOnTopService,
    shutdown: &'static ShutdownSignal,
    // Kept alive to keep the feature flag live
    _config_watcher: Option<ConfigWatcher>,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: SharedConfig) -> Result<Self> {
        info!("Initializing OnTop application");

        // Watching is optional, a missing watcher only means edits need a restart
        let config_watcher = match ConfigWatcher::start(Config::config_path(), config.clone()) {
            Ok(watcher) => {
                info!("Watching configuration at {:?}", watcher.path());
                Some(watcher)
            }
            Err(e) => {
                warn!("Failed to watch configuration: {}", e);
                None
            }
        };

        let service = AlwaysOnTopService::start_native(config.clone())?;
        if !service.is_active() {
            warn!("Running without hooks, system menus will not be changed");
        }

        Ok(Self {
            config,
            service,
            shutdown: shutdown::global(),
            _config_watcher: config_watcher,
        })
    }

    /// Run until a shutdown is requested, then dispose the service
    pub fn run(&mut self) -> Result<()> {
        shutdown::install_console_handler()?;

        if !self.config.read().general.show_always_on_top_item {
            info!("Always-on-top item is disabled in the configuration");
        }

        self.shutdown.wait();
        info!("Shutdown requested");

        self.service.stop();
        self.shutdown.finish();
        Ok(())
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        info!("Cleaning up OnTop application");
        self.service.stop();
        self.shutdown.finish();
    }
}
