//! Local session record.
//!
//! The portal hands out a bearer token after the identity-provider exchange;
//! together with the provider's user fields it forms the session, kept as a
//! small JSON file for the lifetime of the sign-in and removed on sign-out.
//! Establishing the session (the redirect dance itself) happens elsewhere;
//! this module only persists the result.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token attached to every API request.
    pub token: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    /// Whatever else the identity provider included; kept verbatim so a
    /// round-trip through the file loses nothing.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Session {
    /// Reads the session file. A missing file simply means "not signed in".
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("reading session {}", path.display()))
            }
        };
        let session = serde_json::from_str(&raw)
            .with_context(|| format!("parsing session {}", path.display()))?;
        Ok(Some(session))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("writing session {}", path.display()))?;
        Ok(())
    }

    /// Sign-out: removes the session file. Already being signed out is fine.
    pub fn clear(path: &Path) -> anyhow::Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("removing session {}", path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vmportal-session-{}-{}", name, std::process::id()))
    }

    #[test]
    fn round_trips_provider_fields() {
        let path = scratch_path("roundtrip");
        let mut extra = serde_json::Map::new();
        extra.insert("email_verified".into(), serde_json::Value::Bool(true));

        let session = Session {
            token: "tok-123".into(),
            email: Some("user@uia.no".into()),
            name: Some("Test User".into()),
            sub: None,
            extra,
        };
        session.save(&path).unwrap();

        let loaded = Session::load(&path).unwrap().unwrap();
        assert_eq!(loaded, session);

        Session::clear(&path).unwrap();
    }

    #[test]
    fn missing_file_means_signed_out() {
        let path = scratch_path("missing");
        assert_eq!(Session::load(&path).unwrap(), None);
    }

    #[test]
    fn clear_is_idempotent() {
        let path = scratch_path("clear");
        Session {
            token: "tok".into(),
            email: None,
            name: None,
            sub: None,
            extra: serde_json::Map::new(),
        }
        .save(&path)
        .unwrap();

        Session::clear(&path).unwrap();
        Session::clear(&path).unwrap();
        assert_eq!(Session::load(&path).unwrap(), None);
    }
}
