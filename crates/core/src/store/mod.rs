use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::{
    defaults, ConfigurationDocument, GeneralSettings, GeneralSettingsUpdate, ScaleTable,
    WeatherProfile, WeatherProfileUpdate, FALLBACK_TABLE_KEY, FALLBACK_WEATHER,
};
use crate::{ConfigSummary, MusicConfigError, Result};

/// Directory the store lives in unless the caller picks another one.
pub const DEFAULT_DATA_DIR: &str = "MIDI";
/// File name of the primary document inside the data directory.
pub const CONFIG_FILE_NAME: &str = "music_config.json";
/// File name used by [`ConfigStore::export_document`] when none is given.
pub const DEFAULT_EXPORT_NAME: &str = "exported_config.json";

const DOCUMENT_EXTENSION: &str = ".json";

/// Where the active document came from when the store was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Parsed from the existing file.
    File,
    /// No file existed; defaults were written to disk.
    Seeded,
    /// The file existed but could not be read; defaults are active in memory only.
    Recovered,
}

/// Owns the configuration document for the lifetime of the process.
///
/// Every mutator persists the whole document before returning. A failed save
/// is returned to the caller but the in-memory change is kept, so memory and
/// disk can diverge until the next successful save.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    document: ConfigurationDocument,
    builtin: ConfigurationDocument,
    source: LoadSource,
}

impl ConfigStore {
    /// Opens `<data_dir>/music_config.json`.
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        Self::open_file(data_dir.as_ref().join(CONFIG_FILE_NAME))
    }

    /// Opens the document at an explicit path. Never fails: unreadable files
    /// fall back to the defaults.
    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let builtin = defaults();

        let (document, source) = if path.exists() {
            match read_document(&path) {
                Ok(document) => {
                    tracing::info!(path = %path.display(), "configuration loaded");
                    (document, LoadSource::File)
                }
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to load configuration, using defaults"
                    );
                    (builtin.clone(), LoadSource::Recovered)
                }
            }
        } else {
            let document = builtin.clone();
            if let Err(err) = write_document(&path, &document) {
                tracing::error!(path = %path.display(), error = %err, "failed to seed configuration");
            } else {
                tracing::info!(path = %path.display(), "configuration seeded with defaults");
            }
            (document, LoadSource::Seeded)
        };

        Self {
            path,
            document,
            builtin,
            source,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    /// Read-only snapshot of the whole document, for exports and tests.
    /// Front ends use the lookup and enumeration calls instead.
    pub fn document(&self) -> &ConfigurationDocument {
        &self.document
    }

    /// Returns the named profile, or the "Sunny" profile when the name is
    /// unknown. A document without "Sunny" falls back to the built-in one.
    pub fn weather_profile(&self, name: &str) -> &WeatherProfile {
        let mappings = &self.document.weather_mappings;
        mappings
            .get(name)
            .or_else(|| mappings.get(FALLBACK_WEATHER))
            .unwrap_or_else(|| &self.builtin.weather_mappings[FALLBACK_WEATHER])
    }

    pub fn contains_weather(&self, name: &str) -> bool {
        self.document.weather_mappings.contains_key(name)
    }

    /// Weather names in a stable (sorted) order.
    pub fn weather_names(&self) -> Vec<&str> {
        self.document.weather_mappings.keys().map(String::as_str).collect()
    }

    pub fn scale_names(&self) -> Vec<&str> {
        self.document.scales.keys().map(String::as_str).collect()
    }

    pub fn chord_type_names(&self) -> Vec<&str> {
        self.document.chord_types.keys().map(String::as_str).collect()
    }

    pub fn has_scale(&self, name: &str) -> bool {
        self.document.scales.contains_key(name)
    }

    pub fn has_chord_type(&self, name: &str) -> bool {
        self.document.chord_types.contains_key(name)
    }

    /// The live settings record. Changes go through
    /// [`ConfigStore::update_general_settings`].
    pub fn general_settings(&self) -> &GeneralSettings {
        &self.document.general_settings
    }

    pub fn instrument_name(&self, program: u8) -> String {
        self.document
            .instrument_library
            .get(&program)
            .cloned()
            .unwrap_or_else(|| format!("Unknown_{program}"))
    }

    pub fn scale(&self, name: &str) -> &[u8] {
        lookup_or_major(&self.document.scales, &self.builtin.scales, name)
    }

    pub fn chord_intervals(&self, kind: &str) -> &[u8] {
        lookup_or_major(&self.document.chord_types, &self.builtin.chord_types, kind)
    }

    /// Merges `update` into an existing profile and persists.
    ///
    /// An unknown `name` yields [`MusicConfigError::NotFound`] and leaves the
    /// document untouched; this never creates a profile.
    pub fn update_weather_profile(
        &mut self,
        name: &str,
        update: &WeatherProfileUpdate,
    ) -> Result<()> {
        let Some(profile) = self.document.weather_mappings.get_mut(name) else {
            tracing::warn!(weather = name, "weather class not found");
            return Err(MusicConfigError::not_found("weather class", name));
        };
        update.apply_to(profile);
        tracing::debug!(weather = name, fields = ?update.fields(), "weather profile updated");
        self.save()
    }

    /// Inserts or replaces the named profile wholesale and persists.
    pub fn add_weather_profile(&mut self, name: &str, profile: WeatherProfile) -> Result<()> {
        let replaced = self
            .document
            .weather_mappings
            .insert(name.to_string(), profile)
            .is_some();
        tracing::info!(weather = name, replaced, "weather profile added");
        self.save()
    }

    pub fn update_general_settings(&mut self, update: &GeneralSettingsUpdate) -> Result<()> {
        update.apply_to(&mut self.document.general_settings);
        self.save()
    }

    /// Writes the current document to `filename` inside the data directory.
    ///
    /// The primary file and the active document are left alone whether or
    /// not the export succeeds.
    pub fn export_document(&self, filename: &str) -> Result<PathBuf> {
        let target = self.export_path(filename)?;
        if target == self.path {
            return Err(MusicConfigError::msg(format!(
                "export target {} is the primary configuration file",
                target.display()
            )));
        }
        write_document(&target, &self.document).map_err(|err| {
            tracing::error!(path = %target.display(), error = %err, "export failed");
            err
        })?;
        tracing::info!(path = %target.display(), "configuration exported");
        Ok(target)
    }

    /// Resolves where [`ConfigStore::export_document`] would write `filename`.
    ///
    /// The name must be a plain file name; separators and `..` are rejected
    /// so exports stay inside the data directory.
    pub fn export_path(&self, filename: &str) -> Result<PathBuf> {
        let filename = filename.trim();
        let mut name = if filename.is_empty() {
            DEFAULT_EXPORT_NAME.to_string()
        } else {
            filename.to_string()
        };
        if !name.ends_with(DOCUMENT_EXTENSION) {
            name.push_str(DOCUMENT_EXTENSION);
        }

        let mut components = Path::new(&name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.data_dir().join(name)),
            _ => Err(MusicConfigError::invalid_value("export filename", filename)),
        }
    }

    pub fn summarize(&self) -> ConfigSummary {
        ConfigSummary::from_document(&self.document)
    }

    /// Persists the active document to the primary location.
    pub fn save(&self) -> Result<()> {
        match write_document(&self.path, &self.document) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "configuration saved");
                Ok(())
            }
            Err(err) => {
                tracing::error!(path = %self.path.display(), error = %err, "failed to save configuration");
                Err(err)
            }
        }
    }
}

// Scale and chord tables share one shape.
fn lookup_or_major<'a>(
    table: &'a ScaleTable,
    builtin: &'a ScaleTable,
    name: &str,
) -> &'a [u8] {
    table
        .get(name)
        .or_else(|| table.get(FALLBACK_TABLE_KEY))
        .or_else(|| builtin.get(FALLBACK_TABLE_KEY))
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Parses a document from disk without touching any store.
pub fn read_document(path: impl AsRef<Path>) -> Result<ConfigurationDocument> {
    let text = fs::read_to_string(path)?;
    ConfigurationDocument::from_json(&text)
}

/// Pretty-prints `document` to `path` through a temporary sibling file so a
/// failed write never leaves a truncated document behind.
pub fn write_document(path: impl AsRef<Path>, document: &ConfigurationDocument) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let text = document.to_json_pretty()?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, text)?;
    fs::rename(&temp_path, path).map_err(|err| {
        let _ = fs::remove_file(&temp_path);
        MusicConfigError::Io(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, ConfigStore) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::open(dir.path());
        (dir, store)
    }

    fn foggy() -> WeatherProfile {
        WeatherProfile {
            base_note: 50,
            scale: vec![0, 3, 5, 7, 10],
            scale_name: "pentatonic_minor".to_string(),
            chord_type: "minor7".to_string(),
            tempo: 72,
            velocity: 45,
            instrument: 90,
            instrument_name: "Pad 2 (warm)".to_string(),
            octave_range: vec![3, 4],
            rhythm_pattern: vec![1, 0, 0, 0],
            mood: "hazy".to_string(),
        }
    }

    #[test]
    fn missing_file_is_seeded_and_persisted() {
        let (dir, store) = open_temp();
        let path = dir.path().join(CONFIG_FILE_NAME);

        assert_eq!(store.load_source(), LoadSource::Seeded);
        assert!(path.exists());
        assert_eq!(read_document(&path).unwrap(), defaults());
        assert_eq!(store.document(), &defaults());
    }

    #[test]
    fn existing_file_is_used_without_backfill() {
        let dir = TempDir::new().unwrap();
        let mut partial = defaults();
        partial.weather_mappings.remove("Windy");
        write_document(dir.path().join(CONFIG_FILE_NAME), &partial).unwrap();

        let store = ConfigStore::open(dir.path());

        assert_eq!(store.load_source(), LoadSource::File);
        assert!(!store.contains_weather("Windy"));
        assert_eq!(store.weather_names(), ["Rainy", "Stormy", "Sunny"]);
    }

    #[test]
    fn corrupted_file_recovers_to_defaults_without_overwriting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();

        let store = ConfigStore::open(dir.path());

        assert_eq!(store.load_source(), LoadSource::Recovered);
        assert_eq!(store.document(), &defaults());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn unknown_weather_falls_back_to_sunny() {
        let (_dir, store) = open_temp();
        let sunny = store.weather_profile("Sunny").clone();

        for name in ["Hail", "", "sunny", "Snowy "] {
            assert_eq!(store.weather_profile(name), &sunny);
        }
    }

    #[test]
    fn missing_sunny_uses_builtin_fallback() {
        let dir = TempDir::new().unwrap();
        let mut doc = defaults();
        doc.weather_mappings.remove("Sunny");
        write_document(dir.path().join(CONFIG_FILE_NAME), &doc).unwrap();

        let store = ConfigStore::open(dir.path());
        assert_eq!(
            store.weather_profile("Hail"),
            &defaults().weather_mappings["Sunny"]
        );
    }

    #[test]
    fn table_lookups_fall_back() {
        let (_dir, store) = open_temp();

        assert_eq!(store.instrument_name(74), "Flute");
        assert_eq!(store.instrument_name(12), "Unknown_12");
        assert_eq!(store.instrument_name(127), "Unknown_127");

        assert_eq!(store.scale("blues"), &[0, 3, 5, 6, 7, 10]);
        assert_eq!(store.scale("klingon"), store.scale("major"));
        assert_eq!(store.chord_intervals("sus2"), &[0, 2, 7]);
        assert_eq!(store.chord_intervals("power"), store.chord_intervals("major"));
    }

    #[test]
    fn update_changes_only_requested_field() {
        let (dir, mut store) = open_temp();
        let before = store.document().clone();

        let update = WeatherProfileUpdate {
            tempo: Some(100),
            ..Default::default()
        };
        store.update_weather_profile("Sunny", &update).unwrap();

        let mut expected = before;
        expected.weather_mappings.get_mut("Sunny").unwrap().tempo = 100;
        assert_eq!(store.document(), &expected);

        let on_disk = read_document(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(on_disk, expected);
    }

    #[test]
    fn update_of_unknown_weather_is_not_found() {
        let (dir, mut store) = open_temp();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let on_disk_before = fs::read_to_string(&path).unwrap();

        let update = WeatherProfileUpdate {
            tempo: Some(100),
            ..Default::default()
        };
        let err = store
            .update_weather_profile("DoesNotExist", &update)
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("DoesNotExist"));
        assert!(!store.contains_weather("DoesNotExist"));
        assert_eq!(store.document(), &defaults());
        assert_eq!(fs::read_to_string(&path).unwrap(), on_disk_before);
    }

    #[test]
    fn add_then_get_returns_profile() {
        let (dir, mut store) = open_temp();

        store.add_weather_profile("Foggy", foggy()).unwrap();
        assert_eq!(store.weather_profile("Foggy"), &foggy());

        let reopened = ConfigStore::open(dir.path());
        assert_eq!(reopened.weather_profile("Foggy"), &foggy());
    }

    #[test]
    fn add_overwrites_existing_profile() {
        let (_dir, mut store) = open_temp();

        store.add_weather_profile("Rainy", foggy()).unwrap();
        assert_eq!(store.weather_profile("Rainy"), &foggy());
        assert_eq!(store.weather_names().len(), 4);
    }

    #[test]
    fn settings_update_persists() {
        let (dir, mut store) = open_temp();
        let update = GeneralSettingsUpdate {
            sequence_length: Some(32),
            confidence_threshold: Some(0.75),
            ..Default::default()
        };

        store.update_general_settings(&update).unwrap();

        assert_eq!(store.general_settings().sequence_length, 32);
        let reopened = ConfigStore::open(dir.path());
        assert_eq!(reopened.general_settings(), store.general_settings());
    }

    #[test]
    fn export_writes_copy_and_leaves_primary_alone() {
        let (dir, mut store) = open_temp();
        store.add_weather_profile("Foggy", foggy()).unwrap();
        let primary = dir.path().join(CONFIG_FILE_NAME);
        let primary_before = fs::read_to_string(&primary).unwrap();

        let target = store.export_document("backup").unwrap();

        assert_eq!(target, dir.path().join("backup.json"));
        assert_eq!(&read_document(&target).unwrap(), store.document());
        assert_eq!(fs::read_to_string(&primary).unwrap(), primary_before);
        assert_eq!(store.path(), primary);
    }

    #[test]
    fn export_path_normalises_filename() {
        let (dir, store) = open_temp();

        let path = |name: &str| store.export_path(name).unwrap();
        assert_eq!(path(""), dir.path().join(DEFAULT_EXPORT_NAME));
        assert_eq!(path("  "), dir.path().join(DEFAULT_EXPORT_NAME));
        assert_eq!(path("mine.json"), dir.path().join("mine.json"));
        assert_eq!(path("mine.txt"), dir.path().join("mine.txt.json"));
    }

    #[test]
    fn export_path_rejects_anything_but_a_file_name() {
        let (_dir, store) = open_temp();

        for name in ["sub/../music_config", "../escape", "nested/copy", "/tmp/abs"] {
            assert!(
                matches!(
                    store.export_path(name),
                    Err(MusicConfigError::InvalidValue { .. })
                ),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn export_through_parent_dir_leaves_diverged_primary_alone() {
        let (dir, mut store) = open_temp();
        let primary = dir.path().join(CONFIG_FILE_NAME);
        let primary_before = fs::read_to_string(&primary).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        // Diverge memory from disk without a successful save.
        store.document.general_settings.feature_dim = 99;

        assert!(store.export_document("sub/../music_config").is_err());
        assert!(store.export_document("../escape").is_err());
        assert_eq!(fs::read_to_string(&primary).unwrap(), primary_before);
        assert!(!dir.path().parent().unwrap().join("escape.json").exists());
    }

    #[test]
    fn failed_export_does_not_touch_primary() {
        let (dir, store) = open_temp();
        let primary = dir.path().join(CONFIG_FILE_NAME);
        let primary_before = fs::read_to_string(&primary).unwrap();
        fs::create_dir(dir.path().join("taken.json")).unwrap();

        assert!(store.export_document("taken").is_err());
        assert_eq!(fs::read_to_string(&primary).unwrap(), primary_before);
        assert_eq!(store.document(), &defaults());
    }

    #[test]
    fn export_refuses_primary_file() {
        let (_dir, store) = open_temp();
        assert!(store.export_document("music_config").is_err());
    }

    #[test]
    fn failed_save_keeps_in_memory_change() {
        let (dir, mut store) = open_temp();
        let primary = dir.path().join(CONFIG_FILE_NAME);
        fs::remove_file(&primary).unwrap();
        fs::create_dir(&primary).unwrap();

        let update = WeatherProfileUpdate {
            velocity: Some(99),
            ..Default::default()
        };
        let err = store.update_weather_profile("Windy", &update).unwrap_err();

        assert!(matches!(err, MusicConfigError::Io(_)));
        assert_eq!(store.weather_profile("Windy").velocity, 99);
    }

    #[test]
    fn awkward_floats_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let mut doc = defaults();
        doc.general_settings.confidence_threshold = 0.9856906946328695;
        doc.general_settings.chord_duration = 1.0 / 3.0;
        doc.general_settings.melody_duration = 0.1234567890123456;
        write_document(dir.path().join(CONFIG_FILE_NAME), &doc).unwrap();

        let store = ConfigStore::open(dir.path());

        assert_eq!(store.load_source(), LoadSource::File);
        assert_eq!(store.document(), &doc);
    }

    #[test]
    fn summarize_is_idempotent() {
        let (_dir, store) = open_temp();
        assert_eq!(store.summarize(), store.summarize());
        assert_eq!(store.summarize().to_string(), store.summarize().to_string());
    }
}
