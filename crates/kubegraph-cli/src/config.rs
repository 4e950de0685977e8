//! Configuration loading for the CLI binary. Patterned on
//! `familiar-config::GlobalConfig::load()`: layered TOML file sources plus
//! prefixed environment overrides, merged by the `config` crate.

use kubegraph_engine::TraversalConfig;
use serde::{Deserialize, Serialize};

/// Top-level CLI configuration. Currently just wraps the engine's own
/// `TraversalConfig`; kept as a separate struct so CLI-only settings (output
/// format, default namespace, ...) have somewhere to land without touching
/// the engine's configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub traversal: TraversalConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            traversal: TraversalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Layers, from lowest to highest precedence:
    /// 1. `config/defaults.toml` bundled with the crate, if present.
    /// 2. `config/defaults.toml` / `config/local.toml` in the working
    ///    directory the binary was launched from.
    /// 3. `KUBEGRAPH_`-prefixed environment variables (`KUBEGRAPH_TRAVERSAL_MAX_DEPTH=5`).
    ///
    /// Every field carries a compiled-in default (`#[serde(default)]` all
    /// the way down to `TraversalConfig`), so none of these sources need to
    /// exist for `load` to succeed.
    pub fn load() -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        let bundled = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        builder = builder.add_source(config::File::from(bundled.join("defaults")).required(false));

        builder = builder
            .add_source(config::File::with_name("config/defaults").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("KUBEGRAPH").separator("_"));

        let raw = builder.build()?;

        let config = raw
            .try_deserialize::<AppConfig>()
            .unwrap_or_else(|_| AppConfig::default());

        Ok(config)
    }
}
