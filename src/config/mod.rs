//! Host application preferences
//!
//! A small JSON-file-backed key/value store. Holds the selected default
//! providers and per-provider search languages, the cached TheTVDB login
//! token and language list, and user-edited tag mapping tables.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::media::result::MediaKind;

/// Preference store shared by the service layer.
pub struct Prefs {
    values: RwLock<HashMap<String, serde_json::Value>>,
    path: Option<PathBuf>,
}

static SHARED: Lazy<Arc<Prefs>> = Lazy::new(|| {
    Arc::new(Prefs::open_default().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to open preference store, using in-memory prefs");
        Prefs::in_memory()
    }))
});

impl Prefs {
    /// The process-wide preference store.
    pub fn shared() -> Arc<Prefs> {
        SHARED.clone()
    }

    /// Open the store at the platform config location
    /// (`<config dir>/vidmeta/prefs.json`), creating it if missing.
    pub fn open_default() -> Result<Self> {
        let dir = dirs::config_dir()
            .context("No config directory available")?
            .join("vidmeta");
        fs::create_dir_all(&dir).context("Failed to create config directory")?;
        Self::open(dir.join("prefs.json"))
    }

    /// Open the store at an explicit path.
    pub fn open(path: PathBuf) -> Result<Self> {
        let values = if path.exists() {
            let data = fs::read_to_string(&path).context("Failed to read prefs file")?;
            serde_json::from_str(&data).context("Failed to parse prefs file")?
        } else {
            HashMap::new()
        };

        Ok(Self {
            values: RwLock::new(values),
            path: Some(path),
        })
    }

    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            path: None,
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let values = self.values.read();
        values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize preference value");
                return;
            }
        };
        {
            let mut values = self.values.write();
            values.insert(key.to_string(), json);
        }
        self.save();
    }

    pub fn remove(&self, key: &str) {
        {
            let mut values = self.values.write();
            values.remove(key);
        }
        self.save();
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    fn save(&self) {
        let Some(path) = &self.path else { return };

        let snapshot = {
            let values = self.values.read();
            serde_json::to_string_pretty(&*values)
        };

        // Write-then-rename so a crash mid-write never truncates the
        // store.
        let result: Result<()> = snapshot.map_err(anyhow::Error::from).and_then(|data| {
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, data).context("Failed to write prefs file")?;
            fs::rename(&tmp, path).context("Failed to replace prefs file")?;
            Ok(())
        });

        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Failed to save prefs");
        }
    }

    // MARK-style accessors for the well-known keys.

    /// Name of the default metadata provider for a media kind.
    pub fn metadata_provider(&self, kind: MediaKind) -> Option<String> {
        self.string(&format!("metadata.provider.{}", kind.pref_key()))
    }

    pub fn set_metadata_provider(&self, kind: MediaKind, provider: &str) {
        self.set(&format!("metadata.provider.{}", kind.pref_key()), &provider);
    }

    /// Search language selected for a provider and media kind.
    pub fn metadata_language(&self, kind: MediaKind, provider: &str) -> Option<String> {
        self.string(&format!("metadata.language.{}.{}", kind.pref_key(), provider))
    }

    pub fn set_metadata_language(&self, kind: MediaKind, provider: &str, language: &str) {
        self.set(
            &format!("metadata.language.{}.{}", kind.pref_key(), provider),
            &language,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_roundtrip() {
        let prefs = Prefs::in_memory();
        prefs.set("a.number", &42i64);
        prefs.set("a.string", &"hello");
        assert_eq!(prefs.get::<i64>("a.number"), Some(42));
        assert_eq!(prefs.string("a.string"), Some("hello".to_string()));
        assert_eq!(prefs.get::<i64>("missing"), None);
    }

    #[test]
    fn test_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        {
            let prefs = Prefs::open(path.clone()).unwrap();
            prefs.set_metadata_provider(MediaKind::Movie, "TheMovieDB");
            prefs.set_metadata_language(MediaKind::TvShow, "iTunes Store", "USA (English)");
        }

        let reopened = Prefs::open(path).unwrap();
        assert_eq!(
            reopened.metadata_provider(MediaKind::Movie),
            Some("TheMovieDB".to_string())
        );
        assert_eq!(
            reopened.metadata_language(MediaKind::TvShow, "iTunes Store"),
            Some("USA (English)".to_string())
        );
    }

    #[test]
    fn test_save_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = Prefs::open(path.clone()).unwrap();
        prefs.set("first", &1i64);
        prefs.set("second", &2i64);

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = Prefs::open(path).unwrap();
        assert_eq!(reopened.get::<i64>("first"), Some(1));
        assert_eq!(reopened.get::<i64>("second"), Some(2));
    }

    #[test]
    fn test_remove() {
        let prefs = Prefs::in_memory();
        prefs.set("k", &1i64);
        prefs.remove("k");
        assert_eq!(prefs.get::<i64>("k"), None);
    }
}
