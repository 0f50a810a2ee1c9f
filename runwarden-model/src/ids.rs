use crate::error::{ModelError, Result};

/// Identifier of a run record. Assigned by the registry and never reused.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunId(pub i64);

impl RunId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for RunId {
    fn from(value: i64) -> Self {
        RunId(value)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Longest schema name MySQL accepts.
pub const MAX_DATABASE_NAME_LEN: usize = 64;

/// Name of a backing database, validated so it can be safely quoted into
/// DDL statements.
///
/// Only ASCII alphanumerics, `_`, `$` and `-` are accepted, which covers
/// every name the pipeline generates and rules out quoting tricks. `-` is
/// only legal because names are always backtick-quoted in DDL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct DatabaseName(String);

impl DatabaseName {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let name = raw.into();
        if name.is_empty() {
            return Err(ModelError::InvalidDatabaseName {
                name,
                reason: "name is empty",
            });
        }
        if name.len() > MAX_DATABASE_NAME_LEN {
            return Err(ModelError::InvalidDatabaseName {
                name,
                reason: "name is longer than 64 characters",
            });
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-'))
        {
            return Err(ModelError::InvalidDatabaseName {
                name,
                reason: "only ASCII letters, digits, '_', '$' and '-' are allowed",
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backtick-quoted form for use in MySQL DDL.
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0)
    }
}

impl AsRef<str> for DatabaseName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DatabaseName {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        DatabaseName::parse(value)
    }
}

impl From<DatabaseName> for String {
    fn from(value: DatabaseName) -> Self {
        value.0
    }
}

impl std::fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_pipeline_generated_names() {
        let name = DatabaseName::parse("jdoe_DC3b_u_pt1_2024_0710_185025")
            .expect("valid name");
        assert_eq!(name.quoted(), "`jdoe_DC3b_u_pt1_2024_0710_185025`");

        let dashed = DatabaseName::parse("jdoe_DC3b_u_pt1-2024").expect("dash allowed");
        assert_eq!(dashed.quoted(), "`jdoe_DC3b_u_pt1-2024`");
    }

    #[test]
    fn rejects_empty_and_oversized_names() {
        assert!(DatabaseName::parse("").is_err());
        assert!(DatabaseName::parse("a".repeat(65)).is_err());
        assert!(DatabaseName::parse("a".repeat(64)).is_ok());
    }

    #[test]
    fn rejects_quoting_characters() {
        for raw in ["runs`; DROP DATABASE mysql; --", "a b", "a.b", "a/b"] {
            let err = DatabaseName::parse(raw).unwrap_err();
            assert!(matches!(err, ModelError::InvalidDatabaseName { .. }));
        }
    }
}
