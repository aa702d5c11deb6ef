//! Tracing subscriber setup for the `pdfground` binary.
//!
//! The base level comes from `-q` / `-v` / `-vv`. `--log TARGET=LEVEL` pins a
//! single target, and `RUST_LOG` replaces the whole filter when set.

use std::fmt;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prefix shared by every target this workspace logs under.
pub const ROOT_TARGET: &str = "pdfground";

/// Image loads and saves log here; quiet unless asked for.
const STORE_TARGET: &str = "pdfground::store";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// One `TARGET=LEVEL` pin, e.g. `retention=debug`.
///
/// Bare targets are placed under [`ROOT_TARGET`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLevel {
    pub target: String,
    pub level: LevelFilter,
}

impl FromStr for TargetLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, level) = s
            .split_once('=')
            .ok_or_else(|| format!("expected TARGET=LEVEL, got '{}'", s))?;
        let target = target.trim();
        if target.is_empty() {
            return Err(format!("missing target in '{}'", s));
        }

        let level = level
            .trim()
            .parse::<LevelFilter>()
            .map_err(|_| format!("unknown level '{}' for target '{}'", level.trim(), target))?;

        let target = if target == ROOT_TARGET || target.starts_with("pdfground::") {
            target.to_string()
        } else {
            format!("{}::{}", ROOT_TARGET, target)
        };
        Ok(Self { target, level })
    }
}

impl fmt::Display for TargetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.target, self.level.to_string().to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level for everything under [`ROOT_TARGET`].
    pub level: LevelFilter,
    pub pins: Vec<TargetLevel>,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(0, false)
    }
}

impl LogConfig {
    /// `quiet` beats any number of `-v`.
    pub fn new(verbose: u8, quiet: bool) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => LevelFilter::WARN,
            (false, 0) => LevelFilter::INFO,
            (false, 1) => LevelFilter::DEBUG,
            (false, _) => LevelFilter::TRACE,
        };
        Self {
            level,
            pins: Vec::new(),
            format: LogFormat::Text,
        }
    }

    pub fn with_pins(mut self, pins: impl IntoIterator<Item = TargetLevel>) -> Self {
        for pin in pins {
            self.pins.retain(|existing| existing.target != pin.target);
            self.pins.push(pin);
        }
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Filter directives, most general first. Other crates stay at warn.
    pub fn directives(&self) -> Vec<String> {
        let mut directives = vec![
            "warn".to_string(),
            TargetLevel {
                target: ROOT_TARGET.to_string(),
                level: self.level,
            }
            .to_string(),
        ];
        let store_pinned = self.pins.iter().any(|pin| pin.target == STORE_TARGET);
        if self.level == LevelFilter::INFO && !store_pinned {
            directives.push(format!("{}=warn", STORE_TARGET));
        }
        directives.extend(self.pins.iter().map(TargetLevel::to_string));
        directives
    }

    pub fn build_filter(&self) -> EnvFilter {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
        EnvFilter::try_new(self.directives().join(","))
            .unwrap_or_else(|_| EnvFilter::new(format!("{}=info", ROOT_TARGET)))
    }
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init(config: &LogConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.build_filter());
    let installed = match config.format {
        LogFormat::Text => registry
            .with(fmt_layer::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt_layer::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init(),
    };
    installed.is_ok()
}
