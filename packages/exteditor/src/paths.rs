//! Where the application temp directory lives on this machine.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::TempFileConfig;

/// Platform facts the temp root depends on.
#[derive(Debug, Clone)]
pub struct TempEnv {
    pub system_temp: PathBuf,
    pub runtime_dir: Option<PathBuf>,
    pub user: Option<String>,
    pub windows: bool,
}

impl TempEnv {
    pub fn current() -> Self {
        Self::from_lookup(std::env::temp_dir(), |key| std::env::var_os(key))
    }

    /// Build from a system temp dir and an environment lookup. Empty
    /// variables count as unset.
    fn from_lookup(system_temp: PathBuf, lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        Self {
            system_temp,
            runtime_dir: var("XDG_RUNTIME_DIR").map(PathBuf::from),
            user: var("USER").map(|user| user.to_string_lossy().into_owned()),
            windows: cfg!(windows),
        }
    }
}

/// Directory that will hold every run's session files.
pub fn app_root(config: &TempFileConfig, env: &TempEnv) -> PathBuf {
    if let Some(root) = &config.root {
        return root.join(&config.app_dir);
    }
    temp_root(env).join(&config.app_dir)
}

fn temp_root(env: &TempEnv) -> PathBuf {
    if env.windows {
        return env.system_temp.clone();
    }
    if let Some(runtime) = &env.runtime_dir {
        return runtime.clone();
    }
    // A shared /tmp gets a per-user level so users never collide.
    match &env.user {
        Some(user) if is_shared_tmp(&env.system_temp) => env.system_temp.join(user),
        _ => env.system_temp.clone(),
    }
}

fn is_shared_tmp(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == "tmp")
}
