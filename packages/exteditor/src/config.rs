use edit_session::{DEFAULT_MAX_FRAME_BYTES, DEFAULT_OUTBOUND_QUEUE, HostConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// =============================================================================
// Layered config (defaults / config.toml / env vars)
// =============================================================================
//
//   config.toml:     [log]
//                    enabled = true
//
//   env var:         EXTEDITOR_LOG__ENABLED=true   (double underscore = nesting)

/// Top-level configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub log: LogFileConfig,
    #[serde(default)]
    pub temp: TempFileConfig,
    #[serde(default)]
    pub protocol: ProtocolFileConfig,
}

/// Diagnostic output (lives under `[log]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogFileConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Append to this file instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: default_log_level(),
            file: None,
        }
    }
}

/// Where session files live (lives under `[temp]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TempFileConfig {
    /// Overrides the platform temp root entirely.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_app_dir")]
    pub app_dir: String,
}

impl Default for TempFileConfig {
    fn default() -> Self {
        Self {
            root: None,
            app_dir: default_app_dir(),
        }
    }
}

/// Wire limits (lives under `[protocol]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolFileConfig {
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for ProtocolFileConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl ProtocolFileConfig {
    pub fn host_config(&self) -> HostConfig {
        HostConfig {
            max_frame_bytes: self.max_frame_bytes,
            outbound_queue: self.outbound_queue.max(1),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_app_dir() -> String {
    "exteditor".to_string()
}
fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}
fn default_outbound_queue() -> usize {
    DEFAULT_OUTBOUND_QUEUE
}

/// `<config dir>/exteditor/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("exteditor").join("config.toml"))
}

/// Build a figment that layers: defaults → config.toml → EXTEDITOR_* env vars.
///
/// A missing config file is not an error; its layer is simply empty.
///
/// Env vars use double-underscore for nesting into sections:
///   `EXTEDITOR_LOG__LEVEL=debug`  →  `log.level = "debug"`
///   `EXTEDITOR_TEMP__ROOT=/run/x`  →  `temp.root = "/run/x"`
pub fn load_config(config_file: Option<&Path>) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    let mut figment = Figment::from(Serialized::defaults(FileConfig::default()));
    if let Some(path) = config_file {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(Env::prefixed("EXTEDITOR_").split("__"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_config_defaults() {
        let fc = FileConfig::default();
        assert!(!fc.log.enabled);
        assert_eq!(fc.log.level, "info");
        assert!(fc.log.file.is_none());
        assert!(fc.temp.root.is_none());
        assert_eq!(fc.temp.app_dir, "exteditor");
        assert_eq!(fc.protocol.max_frame_bytes, 64 * 1024 * 1024);
        assert_eq!(fc.protocol.outbound_queue, 100);
    }

    #[test]
    fn test_host_config_from_protocol() {
        let pc = ProtocolFileConfig {
            max_frame_bytes: 1024,
            outbound_queue: 0,
        };
        let hc = pc.host_config();
        assert_eq!(hc.max_frame_bytes, 1024);
        assert_eq!(hc.outbound_queue, 1);
    }

    #[test]
    fn test_load_config_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let fc: FileConfig = load_config(Some(&tmp.path().join("config.toml")))
            .extract()
            .unwrap();
        assert!(!fc.log.enabled);
        assert_eq!(fc.temp.app_dir, "exteditor");
    }

    #[test]
    fn test_load_config_toml_overrides_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "[log]\nenabled = true\nlevel = \"debug\"\n\n[temp]\nroot = \"/srv/scratch\"\n\n[protocol]\nmax_frame_bytes = 4096\n",
        )
        .unwrap();

        let fc: FileConfig = load_config(Some(&path)).extract().unwrap();
        assert!(fc.log.enabled);
        assert_eq!(fc.log.level, "debug");
        assert_eq!(fc.temp.root.as_deref(), Some(Path::new("/srv/scratch")));
        assert_eq!(fc.temp.app_dir, "exteditor");
        assert_eq!(fc.protocol.max_frame_bytes, 4096);
        assert_eq!(fc.protocol.outbound_queue, 100);
    }

    #[test]
    fn test_load_config_rejects_bad_types() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[protocol]\nmax_frame_bytes = \"lots\"\n").unwrap();
        assert!(load_config(Some(&path)).extract::<FileConfig>().is_err());
    }
}
