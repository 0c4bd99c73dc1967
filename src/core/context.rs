use reqwest::Client;

use crate::core::config::{DataLayout, LauncherConfig};
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;
use crate::core::http::build_http_client;
use crate::core::platform::Platform;

/// Everything a launch needs from its surroundings, passed explicitly.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub config: LauncherConfig,
    pub layout: DataLayout,
    pub platform: Platform,
    pub http: Client,
    pub events: EventSink,
}

impl LaunchContext {
    /// Context for the current host with a fresh HTTP client.
    pub fn new(config: LauncherConfig, events: EventSink) -> LauncherResult<Self> {
        let http = build_http_client()
            .map_err(|e| LauncherError::Other(format!("Cannot build HTTP client: {}", e)))?;
        Ok(Self::with_parts(config, Platform::current(), http, events))
    }

    pub fn with_parts(
        config: LauncherConfig,
        platform: Platform,
        http: Client,
        events: EventSink,
    ) -> Self {
        let layout = DataLayout::new(&config.launcher.common_dir);
        Self {
            config,
            layout,
            platform,
            http,
            events,
        }
    }

    /// Download engine sharing this context's client, events and concurrency.
    pub fn downloader(&self) -> Downloader {
        Downloader::new(self.http.clone(), self.events.clone())
            .with_concurrency(self.config.launcher.download_concurrency)
    }
}
