use std::{
    env, fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    error::{PolicyError, Result},
    models::PolicyFile,
};

pub const POLICY_PATH_ENV: &str = "RUNWARDEN_POLICY_PATH";

const DEFAULT_CANDIDATES: &[&str] = &["runwarden.toml", "config/runwarden.toml"];

/// How the policy file was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    /// Passed on the command line.
    Explicit(PathBuf),
    /// Taken from `$RUNWARDEN_POLICY_PATH`.
    EnvPath(PathBuf),
    /// First default candidate that exists.
    File(PathBuf),
}

impl PolicySource {
    pub fn path(&self) -> &Path {
        match self {
            PolicySource::Explicit(path)
            | PolicySource::EnvPath(path)
            | PolicySource::File(path) => path,
        }
    }
}

/// Locate the policy file.
///
/// Evaluation order:
/// 1) `explicit` (the `--policy` flag),
/// 2) `$RUNWARDEN_POLICY_PATH`,
/// 3) `runwarden.toml`, then `config/runwarden.toml`, relative to `base`.
pub fn locate(explicit: Option<&Path>, base: &Path) -> Result<PolicySource> {
    if let Some(path) = explicit {
        return Ok(PolicySource::Explicit(path.to_path_buf()));
    }

    if let Ok(path_str) = env::var(POLICY_PATH_ENV)
        && !path_str.trim().is_empty()
    {
        return Ok(PolicySource::EnvPath(PathBuf::from(path_str.trim())));
    }

    let searched: Vec<PathBuf> =
        DEFAULT_CANDIDATES.iter().map(|c| base.join(c)).collect();
    searched
        .iter()
        .find(|path| path.exists())
        .cloned()
        .map(PolicySource::File)
        .ok_or(PolicyError::NotFound { searched })
}

pub fn load_from_file(path: &Path) -> Result<PolicyFile> {
    let contents = fs::read_to_string(path).map_err(|source| PolicyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded policy file");

    let origin = path.display().to_string();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&contents, &origin),
        Some("toml") | Some("tml") => parse_toml(&contents, &origin),
        _ => parse_from_str(&contents, &origin),
    }
}

/// Try TOML first, then JSON.
pub fn parse_from_str(contents: &str, origin: &str) -> Result<PolicyFile> {
    toml::from_str(contents).or_else(|toml_err| {
        serde_json::from_str(contents).map_err(|json_err| PolicyError::Parse {
            origin: origin.to_string(),
            message: format!("toml error: {toml_err}; json error: {json_err}"),
        })
    })
}

fn parse_toml(contents: &str, origin: &str) -> Result<PolicyFile> {
    toml::from_str(contents).map_err(|err| PolicyError::Parse {
        origin: origin.to_string(),
        message: err.to_string(),
    })
}

fn parse_json(contents: &str, origin: &str) -> Result<PolicyFile> {
    serde_json::from_str(contents).map_err(|err| PolicyError::Parse {
        origin: origin.to_string(),
        message: err.to_string(),
    })
}
