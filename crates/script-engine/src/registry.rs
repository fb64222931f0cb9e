//! Script registry and manifest loading
//!
//! Scripts are compiled in and registered under a name. A script manifest is
//! a small TOML file naming exactly one registered entry point plus optional
//! settings for it:
//!
//! ```toml
//! [script]
//! entry = "volatility_spreads"
//!
//! [script.settings]
//! volatility_length = 10
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use crate::error::{ScriptError, ScriptResult};
use crate::script::Script;

/// Builds a script from its manifest settings (`Null` when none were given).
pub type ScriptFactory =
    Box<dyn Fn(&serde_json::Value) -> ScriptResult<Box<dyn Script>> + Send + Sync>;

/// Parsed contents of a script manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptManifest {
    pub path: PathBuf,
    pub entry: String,
    pub settings: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    script: RawScriptSection,
}

#[derive(Debug, Deserialize)]
struct RawScriptSection {
    #[serde(default)]
    entry: Option<EntrySpec>,
    #[serde(default)]
    settings: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntrySpec {
    One(String),
    Many(Vec<String>),
}

impl ScriptManifest {
    /// Reads a manifest, requiring exactly one entry point.
    pub fn from_path(path: &Path) -> ScriptResult<Self> {
        let manifest_error = |reason: String| ScriptError::Manifest {
            path: path.to_path_buf(),
            reason,
        };

        let raw: RawManifest = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|err| manifest_error(err.to_string()))?;

        let mut entries = match raw.script.entry {
            None => Vec::new(),
            Some(EntrySpec::One(name)) => vec![name],
            Some(EntrySpec::Many(names)) => names,
        };
        entries.retain(|name| !name.trim().is_empty());

        let entry = match entries.len() {
            0 => return Err(ScriptError::NoEntryPoint(path.to_path_buf())),
            1 => entries.remove(0),
            _ => {
                return Err(ScriptError::AmbiguousEntryPoint {
                    path: path.to_path_buf(),
                    names: entries,
                })
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            entry,
            settings: raw.script.settings,
        })
    }
}

/// Deserializes a script's settings, falling back to defaults when absent.
pub fn parse_settings<T>(script: &str, settings: &serde_json::Value) -> ScriptResult<T>
where
    T: DeserializeOwned + Default,
{
    if settings.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(settings.clone()).map_err(|err| ScriptError::Settings {
        name: script.to_string(),
        reason: err.to_string(),
    })
}

/// A script instantiated from a manifest.
pub struct LoadedScript {
    pub name: String,
    pub script: Box<dyn Script>,
}

/// Named script factories.
#[derive(Default)]
pub struct ScriptRegistry {
    factories: BTreeMap<String, ScriptFactory>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the scripts shipped with this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::scripts::register_builtin(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> ScriptResult<()>
    where
        F: Fn(&serde_json::Value) -> ScriptResult<Box<dyn Script>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(ScriptError::DuplicateRegistration(name));
        }
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(
        &self,
        name: &str,
        settings: &serde_json::Value,
    ) -> ScriptResult<Box<dyn Script>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ScriptError::UnknownScript(name.to_string()))?;
        factory(settings)
    }

    /// Reads the manifest at `path` and builds its entry point.
    pub fn load(&self, path: &Path) -> ScriptResult<LoadedScript> {
        let manifest = ScriptManifest::from_path(path)?;
        let script = self.create(&manifest.entry, &manifest.settings)?;
        info!(script = %manifest.entry, path = %path.display(), "loaded script");
        Ok(LoadedScript {
            name: manifest.entry,
            script,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct Quiet;
    impl Script for Quiet {}

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Knobs {
        levels: i64,
    }

    fn manifest(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn registry() -> ScriptRegistry {
        let mut registry = ScriptRegistry::new();
        registry
            .register("quiet", |_settings: &serde_json::Value| -> ScriptResult<Box<dyn Script>> {
                Ok(Box::new(Quiet))
            })
            .unwrap();
        registry
    }

    #[test]
    fn test_manifest_with_single_entry() {
        let file = manifest("[script]\nentry = \"quiet\"\n\n[script.settings]\nlevels = 3\n");
        let parsed = ScriptManifest::from_path(file.path()).unwrap();
        assert_eq!(parsed.entry, "quiet");

        let knobs: Knobs = parse_settings("quiet", &parsed.settings).unwrap();
        assert_eq!(knobs, Knobs { levels: 3 });

        let loaded = registry().load(file.path()).unwrap();
        assert_eq!(loaded.name, "quiet");
    }

    #[test]
    fn test_manifest_without_entry_is_rejected() {
        let file = manifest("[script]\n");
        assert!(matches!(
            ScriptManifest::from_path(file.path()),
            Err(ScriptError::NoEntryPoint(_))
        ));
    }

    #[test]
    fn test_manifest_with_two_entries_is_ambiguous() {
        let file = manifest("[script]\nentry = [\"quiet\", \"loud\"]\n");
        match ScriptManifest::from_path(file.path()) {
            Err(ScriptError::AmbiguousEntryPoint { names, .. }) => {
                assert_eq!(names, vec!["quiet".to_string(), "loud".to_string()]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_entry_and_missing_file() {
        let file = manifest("[script]\nentry = \"loud\"\n");
        assert!(matches!(
            registry().load(file.path()),
            Err(ScriptError::UnknownScript(name)) if name == "loud"
        ));
        assert!(matches!(
            registry().load(Path::new("/nonexistent/script.toml")),
            Err(ScriptError::Manifest { .. })
        ));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = registry();
        let again = registry.register(
            "quiet",
            |_: &serde_json::Value| -> ScriptResult<Box<dyn Script>> { Ok(Box::new(Quiet)) },
        );
        assert!(matches!(again, Err(ScriptError::DuplicateRegistration(_))));
    }

    #[test]
    fn test_null_settings_use_defaults() {
        let knobs: Knobs = parse_settings("quiet", &serde_json::Value::Null).unwrap();
        assert_eq!(knobs, Knobs::default());
        assert!(matches!(
            parse_settings::<Knobs>("quiet", &serde_json::json!({"levels": "many"})),
            Err(ScriptError::Settings { .. })
        ));
    }
}
