//! Layered TOML configuration: defaults -> `mimir.toml` -> env overrides,
//! the same shape `arawn-config`'s discovery module layers XDG + project
//! config, scoped down to what this core needs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Raw, partially-specified config as read from TOML. Every field is
/// optional so a later layer only overrides what it actually sets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub engine: RawEngineSection,
    #[serde(default)]
    pub queue: RawQueueSection,
    #[serde(default)]
    pub worker: RawWorkerSection,
    #[serde(default)]
    pub scaling: RawScalingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEngineSection {
    pub max_context_bytes: Option<usize>,
    pub step_budget_multiplier: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQueueSection {
    pub record_ttl_secs: Option<u64>,
    pub stale_execution_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWorkerSection {
    pub poll_backoff_min_ms: Option<u64>,
    pub poll_backoff_max_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawScalingSection {
    pub min_workers: Option<usize>,
    pub max_workers: Option<usize>,
    pub queue_threshold: Option<usize>,
}

impl RawConfig {
    /// Later values win; unset fields fall through to whatever `self`
    /// already had.
    pub fn merge(&mut self, other: RawConfig) {
        macro_rules! take {
            ($dst:expr, $src:expr) => {
                if $src.is_some() {
                    $dst = $src;
                }
            };
        }
        take!(self.engine.max_context_bytes, other.engine.max_context_bytes);
        take!(self.engine.step_budget_multiplier, other.engine.step_budget_multiplier);
        take!(self.queue.record_ttl_secs, other.queue.record_ttl_secs);
        take!(
            self.queue.stale_execution_timeout_secs,
            other.queue.stale_execution_timeout_secs
        );
        take!(self.worker.poll_backoff_min_ms, other.worker.poll_backoff_min_ms);
        take!(self.worker.poll_backoff_max_ms, other.worker.poll_backoff_max_ms);
        take!(self.scaling.min_workers, other.scaling.min_workers);
        take!(self.scaling.max_workers, other.scaling.max_workers);
        take!(self.scaling.queue_threshold, other.scaling.queue_threshold);
    }
}

/// Fully-resolved settings with every field defaulted, ready to hand to the
/// engine/queue/worker/scaling constructors.
#[derive(Debug, Clone)]
pub struct Settings {
    pub max_context_bytes: usize,
    pub step_budget_multiplier: usize,
    pub queue_record_ttl: Duration,
    pub stale_execution_timeout: Duration,
    pub poll_backoff_min: Duration,
    pub poll_backoff_max: Duration,
    pub min_workers: usize,
    pub max_workers: usize,
    pub queue_threshold: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_context_bytes: mimir_context::DEFAULT_MAX_CONTEXT_BYTES,
            step_budget_multiplier: 10,
            queue_record_ttl: mimir_queue::DEFAULT_RECORD_TTL,
            stale_execution_timeout: Duration::from_secs(15 * 60),
            poll_backoff_min: mimir_worker::MIN_POLL_BACKOFF,
            poll_backoff_max: mimir_worker::MAX_POLL_BACKOFF,
            min_workers: 1,
            max_workers: 10,
            queue_threshold: 20,
        }
    }
}

impl RawConfig {
    pub fn resolve(self) -> Settings {
        let mut s = Settings::default();
        if let Some(v) = self.engine.max_context_bytes {
            s.max_context_bytes = v;
        }
        if let Some(v) = self.engine.step_budget_multiplier {
            s.step_budget_multiplier = v;
        }
        if let Some(v) = self.queue.record_ttl_secs {
            s.queue_record_ttl = Duration::from_secs(v);
        }
        if let Some(v) = self.queue.stale_execution_timeout_secs {
            s.stale_execution_timeout = Duration::from_secs(v);
        }
        if let Some(v) = self.worker.poll_backoff_min_ms {
            s.poll_backoff_min = Duration::from_millis(v);
        }
        if let Some(v) = self.worker.poll_backoff_max_ms {
            s.poll_backoff_max = Duration::from_millis(v);
        }
        if let Some(v) = self.scaling.min_workers {
            s.min_workers = v;
        }
        if let Some(v) = self.scaling.max_workers {
            s.max_workers = v;
        }
        if let Some(v) = self.scaling.queue_threshold {
            s.queue_threshold = v;
        }
        s
    }
}

/// Load `mimir.toml` relative to `project_dir` (or the working directory),
/// then apply a small set of env overrides, then resolve to concrete
/// settings. Missing files are not an error; every layer is optional.
pub fn load(project_dir: Option<&Path>) -> anyhow::Result<Settings> {
    let mut config = RawConfig::default();

    let path = project_dir
        .map(|d| d.join("mimir.toml"))
        .unwrap_or_else(|| PathBuf::from("mimir.toml"));
    if path.exists() {
        let text = std::fs::read_to_string(&path)?;
        let layer: RawConfig = toml::from_str(&text)?;
        config.merge(layer);
    }

    apply_env_overrides(&mut config);
    Ok(config.resolve())
}

fn apply_env_overrides(config: &mut RawConfig) {
    if let Some(v) = env_usize("MIMIR_MAX_CONTEXT_BYTES") {
        config.engine.max_context_bytes = Some(v);
    }
    if let Some(v) = env_usize("MIMIR_STEP_BUDGET_MULTIPLIER") {
        config.engine.step_budget_multiplier = Some(v);
    }
    if let Some(v) = env_u64("MIMIR_QUEUE_RECORD_TTL_SECS") {
        config.queue.record_ttl_secs = Some(v);
    }
    if let Some(v) = env_usize("MIMIR_MIN_WORKERS") {
        config.scaling.min_workers = Some(v);
    }
    if let Some(v) = env_usize("MIMIR_MAX_WORKERS") {
        config.scaling.max_workers = Some(v);
    }
    if let Some(v) = env_usize("MIMIR_QUEUE_THRESHOLD") {
        config.scaling.queue_threshold = Some(v);
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = RawConfig::default().resolve();
        assert_eq!(settings.min_workers, 1);
        assert_eq!(settings.max_workers, 10);
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("mimir.toml"),
            "[scaling]\nmin_workers = 3\nmax_workers = 7\n",
        )
        .unwrap();
        let settings = load(Some(dir.path())).unwrap();
        assert_eq!(settings.min_workers, 3);
        assert_eq!(settings.max_workers, 7);
    }

    #[test]
    fn merge_only_overwrites_fields_the_later_layer_sets() {
        let mut base = RawConfig::default();
        base.scaling.min_workers = Some(2);
        base.scaling.max_workers = Some(9);

        let mut override_layer = RawConfig::default();
        override_layer.scaling.max_workers = Some(20);
        base.merge(override_layer);

        assert_eq!(base.scaling.min_workers, Some(2));
        assert_eq!(base.scaling.max_workers, Some(20));
    }
}
