use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use ar_detection::ScanLimits;
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// What counts as an actionable dialog and how much text is scanned for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Operation names that may be answered automatically
    #[serde(default = "default_whitelisted_tools")]
    pub whitelisted_tools: Vec<String>,

    /// Optional text file with one operation name per line
    /// (overrides `whitelisted_tools` when set)
    #[serde(default)]
    pub tools_file: Option<String>,

    /// Lines inspected on the first pass
    #[serde(default = "default_initial_lines")]
    pub initial_lines: usize,

    /// Lines added per expansion step
    #[serde(default = "default_expansion_increment")]
    pub expansion_increment: usize,

    /// Hard ceiling on the scanned window
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Countdown between detection and response
    #[serde(default = "default_response_delay_secs")]
    pub response_delay_secs: f64,
    /// Interval between monitoring cycles
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: f64,
    /// Interval used while no countdown is running (defaults to check_interval_secs)
    #[serde(default)]
    pub idle_check_interval_secs: Option<f64>,
    /// No new countdown may start this soon after a response was sent
    #[serde(default = "default_rate_limit_secs")]
    pub rate_limit_secs: f64,
    /// A cancelled prompt may be re-detected immediately within this window
    #[serde(default = "default_cancel_grace_secs")]
    pub cancel_grace_secs: f64,
    /// Pause after switching focus, before keys are sent
    #[serde(default = "default_focus_switch_pause_ms")]
    pub focus_switch_pause_ms: u64,
    /// Pause between the option key and the confirming Enter
    #[serde(default = "default_key_pause_ms")]
    pub key_pause_ms: u64,
    /// Upper bound for any single host script call
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

/// Which surfaces are watched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// Every terminal window/pane the host can enumerate
    #[default]
    All,
    /// Only the focused terminal window
    Single,
}

/// Host integration used to read text and send keys
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HostBackend {
    /// tmux when running inside a tmux session, otherwise the platform default
    #[default]
    Auto,
    Macos,
    Tmux,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub mode: MonitorMode,
    #[serde(default)]
    pub backend: HostBackend,
    #[serde(default)]
    pub enable_sleep_detection: bool,
    /// Cycles between housekeeping reports
    #[serde(default = "default_housekeeping_cycles")]
    pub housekeeping_cycles: u64,
}

pub fn default_whitelisted_tools() -> Vec<String> {
    [
        "Read file",
        "Read files",
        "Edit file",
        "Edit files",
        "Bash command",
        "Bash",
        "Write",
        "Write file",
        "Write files",
        "MultiEdit",
        "Grep",
        "Glob",
        "LS",
        "WebFetch",
        "WebSearch",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_initial_lines() -> usize {
    50
}

fn default_expansion_increment() -> usize {
    100
}

fn default_max_lines() -> usize {
    2000
}

fn default_response_delay_secs() -> f64 {
    5.0
}

fn default_check_interval_secs() -> f64 {
    1.0
}

fn default_rate_limit_secs() -> f64 {
    2.0
}

fn default_cancel_grace_secs() -> f64 {
    5.0
}

fn default_focus_switch_pause_ms() -> u64 {
    300
}

fn default_key_pause_ms() -> u64 {
    300
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}

fn default_housekeeping_cycles() -> u64 {
    100
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            whitelisted_tools: default_whitelisted_tools(),
            tools_file: None,
            initial_lines: default_initial_lines(),
            expansion_increment: default_expansion_increment(),
            max_lines: default_max_lines(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            response_delay_secs: default_response_delay_secs(),
            check_interval_secs: default_check_interval_secs(),
            idle_check_interval_secs: None,
            rate_limit_secs: default_rate_limit_secs(),
            cancel_grace_secs: default_cancel_grace_secs(),
            focus_switch_pause_ms: default_focus_switch_pause_ms(),
            key_pause_ms: default_key_pause_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: MonitorMode::All,
            backend: HostBackend::Auto,
            enable_sleep_detection: false,
            housekeeping_cycles: default_housekeeping_cycles(),
        }
    }
}

const DEFAULT_PATHS: [&str; 3] = [
    "./autorespond.toml",
    "~/.config/autorespond/config.toml",
    "~/.autorespond.toml",
];

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub response_delay_secs: Option<f64>,
    pub check_interval_secs: Option<f64>,
    /// Replaces the whitelist outright; no tools file is read
    pub tools: Option<Vec<String>>,
    pub tools_file: Option<String>,
    pub mode: Option<MonitorMode>,
    pub backend: Option<HostBackend>,
    pub enable_sleep_detection: bool,
}

impl Config {
    /// Loads `config_path`, else the first default location that exists,
    /// else the built-in defaults. Nothing is written to disk.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_from(config_path, &DEFAULT_PATHS)
    }

    pub fn load_from(config_path: Option<&str>, default_paths: &[&str]) -> Result<Self> {
        let path_to_load = match config_path {
            Some(path) => {
                if !Path::new(path).exists() {
                    anyhow::bail!("Configuration file '{}' not found", path);
                }
                Some(path.to_string())
            }
            None => default_paths.iter().find_map(|path| {
                let expanded_path = shellexpand::tilde(path);
                Path::new(expanded_path.as_ref())
                    .exists()
                    .then(|| expanded_path.to_string())
            }),
        };

        let Some(path) = path_to_load else {
            debug!("No configuration file found, using defaults");
            return Ok(Self::default());
        };

        let config_content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&config_content)
            .map_err(|e| anyhow::anyhow!("Invalid configuration in '{}': {}", path, e))?;
        config.validate()?;
        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    pub fn load_with_overrides(config_path: Option<&str>, overrides: Overrides) -> Result<Self> {
        let mut config = Self::load(config_path)?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(delay) = overrides.response_delay_secs {
            self.timing.response_delay_secs = delay;
        }
        if let Some(interval) = overrides.check_interval_secs {
            self.timing.check_interval_secs = interval;
        }
        if let Some(tools) = overrides.tools {
            self.detection.whitelisted_tools = tools;
            self.detection.tools_file = None;
        } else if let Some(tools_file) = overrides.tools_file {
            self.detection.tools_file = Some(tools_file);
        }
        if let Some(mode) = overrides.mode {
            self.monitor.mode = mode;
        }
        if let Some(backend) = overrides.backend {
            self.monitor.backend = backend;
        }
        if overrides.enable_sleep_detection {
            self.monitor.enable_sleep_detection = true;
        }
    }

    /// Whitelist in effect: the tools file when one is configured, otherwise
    /// the inline list.
    pub fn scan_limits(&self) -> ScanLimits {
        ScanLimits {
            initial_lines: self.detection.initial_lines,
            increment: self.detection.expansion_increment,
            max_lines: self.detection.max_lines,
        }
    }

    pub fn whitelist(&self) -> Vec<String> {
        match &self.detection.tools_file {
            Some(path) => load_whitelist_file(path),
            None => self.detection.whitelisted_tools.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let timing = &self.timing;
        if !(timing.response_delay_secs >= 0.0) {
            anyhow::bail!(
                "response_delay_secs must be zero or positive, got {}",
                timing.response_delay_secs
            );
        }
        if !(timing.check_interval_secs > 0.0) {
            anyhow::bail!(
                "check_interval_secs must be positive, got {}",
                timing.check_interval_secs
            );
        }
        if let Some(idle) = timing.idle_check_interval_secs {
            if !(idle > 0.0) {
                anyhow::bail!("idle_check_interval_secs must be positive, got {}", idle);
            }
        }
        if timing.rate_limit_secs < 0.0 || timing.cancel_grace_secs < 0.0 {
            anyhow::bail!("rate_limit_secs and cancel_grace_secs must not be negative");
        }

        let detection = &self.detection;
        if detection.tools_file.is_none()
            && detection.whitelisted_tools.iter().all(|t| t.trim().is_empty())
        {
            anyhow::bail!("whitelisted_tools must contain at least one operation name");
        }
        if detection.initial_lines == 0 || detection.expansion_increment == 0 {
            anyhow::bail!("initial_lines and expansion_increment must be positive");
        }
        if detection.initial_lines > detection.max_lines {
            anyhow::bail!(
                "initial_lines ({}) must not exceed max_lines ({})",
                detection.initial_lines,
                detection.max_lines
            );
        }
        Ok(())
    }

    /// Idle-cycle interval, falling back to the regular interval.
    pub fn idle_check_interval_secs(&self) -> f64 {
        self.timing
            .idle_check_interval_secs
            .unwrap_or(self.timing.check_interval_secs)
    }
}

/// Reads one operation name per line, skipping blanks and `#` comments.
/// A missing or unreadable file yields the default whitelist.
pub fn load_whitelist_file(path: &str) -> Vec<String> {
    let expanded = shellexpand::tilde(path);
    match std::fs::read_to_string(expanded.as_ref()) {
        Ok(content) => {
            let tools = parse_whitelist(&content);
            if tools.is_empty() {
                warn!("Tools file '{}' lists no tools, using defaults", path);
                return default_whitelisted_tools();
            }
            tools
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Tools file '{}' not found, using defaults", path);
            default_whitelisted_tools()
        }
        Err(e) => {
            warn!("Error reading tools file '{}': {}, using defaults", path, e);
            default_whitelisted_tools()
        }
    }
}

pub fn parse_whitelist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Splits a comma-separated `--tools` value.
pub fn parse_tools_arg(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
