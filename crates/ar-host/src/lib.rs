// Suppress warnings from objc crate macros
#![allow(unexpected_cfgs)]

pub mod applescript;
pub mod error;
#[cfg(target_os = "macos")]
pub mod macos;
pub mod script;
pub mod sleep;
pub mod tmux;

pub use error::HostError;
pub use script::ScriptRunner;
pub use sleep::SleepDetector;
pub use tmux::TmuxHost;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ar_config::{Config, HostBackend};
use ar_core::Host;
use tracing::info;

/// Resolves `Auto` to a concrete backend: tmux when running inside a tmux
/// session, otherwise the platform's own backend.
pub fn resolve_backend(requested: HostBackend, inside_tmux: bool) -> HostBackend {
    match requested {
        HostBackend::Auto if inside_tmux => HostBackend::Tmux,
        HostBackend::Auto if cfg!(target_os = "macos") => HostBackend::Macos,
        HostBackend::Auto => HostBackend::Tmux,
        other => other,
    }
}

// Platform-specific constructor
pub fn create_host(config: &Config) -> Result<Arc<dyn Host>> {
    let inside_tmux = std::env::var_os("TMUX").is_some();
    let backend = resolve_backend(config.monitor.backend, inside_tmux);
    let runner = ScriptRunner::new(Duration::from_millis(config.timing.fetch_timeout_ms));
    let key_pause = Duration::from_millis(config.timing.key_pause_ms);
    info!("Using {:?} host backend", backend);

    match backend {
        HostBackend::Macos => {
            #[cfg(target_os = "macos")]
            return Ok(Arc::new(macos::MacOsHost::new(runner, key_pause)));

            #[cfg(not(target_os = "macos"))]
            return Err(HostError::Unsupported("the macOS backend").into());
        }
        HostBackend::Tmux | HostBackend::Auto => Ok(Arc::new(TmuxHost::new(runner, key_pause))),
    }
}
