use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Bounds on the in-memory session map.
///
/// Sessions and their conversation checkpoints live in process memory only.
/// The capacity cap evicts least-recently-used entries; the idle TTL sweeps
/// sessions that have not been touched for a while.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "d_max_entries")]
    pub max_entries: usize,
    #[serde(default = "d_idle_ttl")]
    pub idle_ttl_secs: u64,
    /// How often the background pruning task runs.
    #[serde(default = "d_sweep")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_entries: d_max_entries(),
            idle_ttl_secs: d_idle_ttl(),
            sweep_interval_secs: d_sweep(),
        }
    }
}

fn d_max_entries() -> usize {
    1024
}
fn d_idle_ttl() -> u64 {
    86_400
}
fn d_sweep() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_config_defaults() {
        let cfg: SessionsConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.max_entries, 1024);
        assert_eq!(cfg.idle_ttl_secs, 86_400);
        assert_eq!(cfg.sweep_interval_secs, 300);
    }
}
