use std::time::Instant;
use tracing::{debug, error, info, warn};

pub struct Logger;

impl Logger {
    pub fn init() {
        tracing_subscriber::fmt()
            .with_env_filter("cinder=debug")
            .with_target(false)
            .init();
    }

    pub fn processing_css(name: &str) {
        debug!("🎨 Processing CSS: {}", name);
    }

    pub fn skipped_precheck(name: &str) {
        debug!("⚡ No import/url syntax in {}, skipping dependency walk", name);
    }

    pub fn found_dependency(specifier: &str) {
        debug!("🔗 Dependency: {}", specifier);
    }

    pub fn rewrote_url(from: &str, to: &str) {
        debug!("✏️  Rewrote url({}) -> url({})", from, to);
    }

    pub fn running_transform(name: &str) {
        debug!("🔧 Transform: {}", name);
    }

    pub fn asset_complete(name: &str, deps: usize, elapsed: std::time::Duration) {
        info!(
            "✅ {} processed ({} dependencies, {:.2?})",
            name, deps, elapsed
        );
    }

    pub fn error(msg: &str) {
        error!("❌ {}", msg);
    }

    pub fn warn(msg: &str) {
        warn!("⚠️  {}", msg);
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        debug!("⏱️  Starting: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("⏱️  Completed: {} in {:.2?}", self.name, self.elapsed());
    }
}
