//! Database credentials for the superuser a pass runs as.
//!
//! Resolution order: environment, then the auth file entry for the host and
//! port, then an interactive prompt. The password never leaves a
//! [`Zeroizing`] buffer and is never printed.

use std::{
    env, fmt, fs,
    io::IsTerminal,
    path::{Path, PathBuf},
};

use dialoguer::{Input, Password, console::Term};
use serde::Deserialize;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::{
    error::{PolicyError, Result},
    models::DEFAULT_MYSQL_PORT,
};

pub const DB_USER_ENV: &str = "RUNWARDEN_DB_USER";
pub const DB_PASSWORD_ENV: &str = "RUNWARDEN_DB_PASSWORD";
pub const DB_PASSWORD_FILE_ENV: &str = "RUNWARDEN_DB_PASSWORD_FILE";

#[derive(Clone)]
pub struct DbCredentials {
    pub user: String,
    pub password: Zeroizing<String>,
}

impl DbCredentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: Zeroizing::new(password.into()),
        }
    }
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where resolved credentials came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Env,
    AuthFile(PathBuf),
    Prompt,
}

/// Credential-related environment, captured once so resolution is testable.
#[derive(Clone, Default)]
pub struct CredentialEnv {
    pub user: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub password_file: Option<PathBuf>,
}

impl fmt::Debug for CredentialEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEnv")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_file", &self.password_file)
            .finish()
    }
}

impl CredentialEnv {
    pub fn from_process() -> Self {
        let non_empty = |key: &str| {
            env::var(key)
                .ok()
                .filter(|value| !value.trim().is_empty())
        };
        Self {
            user: non_empty(DB_USER_ENV),
            password: non_empty(DB_PASSWORD_ENV).map(Zeroizing::new),
            password_file: non_empty(DB_PASSWORD_FILE_ENV).map(PathBuf::from),
        }
    }
}

/// One `[[auth]]` entry of the auth file.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthEntry {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub password: Zeroizing<String>,
}

impl fmt::Debug for AuthEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthEntry")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl AuthEntry {
    fn matches(&self, host: &str, port: u16) -> bool {
        self.port == port && self.host.trim().eq_ignore_ascii_case(host)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AuthFile {
    #[serde(default)]
    auth: Vec<AuthEntry>,
}

fn default_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

pub fn load_auth_entries(path: &Path) -> Result<Vec<AuthEntry>> {
    let contents = Zeroizing::new(fs::read_to_string(path).map_err(|source| {
        PolicyError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?);
    let parsed: AuthFile =
        toml::from_str(&contents).map_err(|err| PolicyError::Parse {
            origin: path.display().to_string(),
            message: err.to_string(),
        })?;
    Ok(parsed.auth)
}

pub fn read_secret_file(path: &Path) -> Result<Option<Zeroizing<String>>> {
    let contents = Zeroizing::new(fs::read_to_string(path).map_err(|source| {
        PolicyError::SecretFileIo {
            path: path.to_path_buf(),
            source,
        }
    })?);
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Zeroizing::new(trimmed.to_string())))
    }
}

#[derive(Debug, Clone)]
pub struct CredentialResolver {
    env: CredentialEnv,
    auth_file: Option<PathBuf>,
    interactive: bool,
}

impl CredentialResolver {
    pub fn new(env: CredentialEnv, auth_file: Option<PathBuf>) -> Self {
        Self {
            env,
            auth_file,
            interactive: false,
        }
    }

    /// Allow prompting. The prompt is still skipped when stdin is not a
    /// terminal.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn resolve(
        &self,
        host: &str,
        port: u16,
    ) -> Result<(DbCredentials, CredentialSource)> {
        if let Some(credentials) = self.from_env()? {
            debug!(user = %credentials.user, "using credentials from environment");
            return Ok((credentials, CredentialSource::Env));
        }

        if let Some(path) = &self.auth_file {
            let entries = load_auth_entries(path)?;
            if let Some(entry) =
                entries.into_iter().find(|entry| entry.matches(host, port))
            {
                debug!(
                    user = %entry.user,
                    path = %path.display(),
                    "using credentials from auth file"
                );
                return Ok((
                    DbCredentials {
                        user: entry.user,
                        password: entry.password,
                    },
                    CredentialSource::AuthFile(path.clone()),
                ));
            }
        }

        if self.interactive && std::io::stdin().is_terminal() {
            info!(host, port, "no stored credentials; prompting");
            return Ok((prompt(host, port)?, CredentialSource::Prompt));
        }

        Err(PolicyError::MissingCredentials {
            host: host.to_string(),
            port,
        })
    }

    fn from_env(&self) -> Result<Option<DbCredentials>> {
        let Some(user) = self.env.user.clone() else {
            return Ok(None);
        };

        if let Some(password) = &self.env.password {
            return Ok(Some(DbCredentials {
                user,
                password: password.clone(),
            }));
        }

        if let Some(path) = &self.env.password_file
            && let Some(password) = read_secret_file(path)?
        {
            return Ok(Some(DbCredentials { user, password }));
        }

        warn!(
            user = %user,
            "{DB_USER_ENV} is set without {DB_PASSWORD_ENV} or a non-empty \
             {DB_PASSWORD_FILE_ENV}; ignoring it"
        );
        Ok(None)
    }
}

fn prompt(host: &str, port: u16) -> Result<DbCredentials> {
    let term = Term::stderr();
    let user: String = Input::new()
        .with_prompt(format!("MySQL user for {host}:{port}"))
        .interact_text_on(&term)?;
    let password = Zeroizing::new(
        Password::new()
            .with_prompt(format!("Password for {user}"))
            .interact_on(&term)?,
    );
    Ok(DbCredentials { user, password })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const AUTH: &str = r#"
[[auth]]
host = "db.example.org"
port = 3306
user = "admin"
password = "s3cret"

[[auth]]
host = "db.example.org"
port = 3307
user = "other"
password = "other-secret"
"#;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn env_credentials_take_precedence() {
        let dir = TempDir::new().unwrap();
        let auth = write(&dir, "auth.toml", AUTH);
        let env = CredentialEnv {
            user: Some("ops".into()),
            password: Some(Zeroizing::new("pw".into())),
            password_file: None,
        };

        let (creds, source) = CredentialResolver::new(env, Some(auth))
            .resolve("db.example.org", 3306)
            .unwrap();
        assert_eq!(source, CredentialSource::Env);
        assert_eq!(creds.user, "ops");
        assert_eq!(creds.password.as_str(), "pw");
    }

    #[test]
    fn password_file_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let secret = write(&dir, "pw", "  from-file\n");
        let env = CredentialEnv {
            user: Some("ops".into()),
            password: None,
            password_file: Some(secret),
        };

        let (creds, _) = CredentialResolver::new(env, None)
            .resolve("db", 3306)
            .unwrap();
        assert_eq!(creds.password.as_str(), "from-file");
    }

    #[test]
    fn env_user_without_password_falls_through_to_auth_file() {
        let dir = TempDir::new().unwrap();
        let auth = write(&dir, "auth.toml", AUTH);
        let empty = write(&dir, "pw", "\n");
        let env = CredentialEnv {
            user: Some("ops".into()),
            password: None,
            password_file: Some(empty),
        };

        let (creds, source) = CredentialResolver::new(env, Some(auth.clone()))
            .resolve("db.example.org", 3306)
            .unwrap();
        assert_eq!(source, CredentialSource::AuthFile(auth));
        assert_eq!(creds.user, "admin");
    }

    #[test]
    fn auth_file_matches_host_and_port() {
        let dir = TempDir::new().unwrap();
        let auth = write(&dir, "auth.toml", AUTH);

        let (creds, source) =
            CredentialResolver::new(CredentialEnv::default(), Some(auth.clone()))
                .resolve("DB.example.org", 3307)
                .unwrap();
        assert_eq!(creds.user, "other");
        assert_eq!(source, CredentialSource::AuthFile(auth));
    }

    #[test]
    fn missing_credentials_without_prompt_is_fatal() {
        let dir = TempDir::new().unwrap();
        let auth = write(&dir, "auth.toml", AUTH);

        let err = CredentialResolver::new(CredentialEnv::default(), Some(auth))
            .resolve("elsewhere", 3306)
            .unwrap_err();
        assert!(matches!(err, PolicyError::MissingCredentials { port: 3306, .. }));
    }

    #[test]
    fn debug_output_redacts_password() {
        let creds = DbCredentials::new("admin", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }
}
