//! Edit-session helpers that sit between an interactive front end and the
//! [`ConfigStore`].
//!
//! Front ends collect raw `field=value` strings from the user. This module
//! coerces them into typed updates, drops the fields that do not parse, and
//! forwards whatever survived to the store in a single persisted call.

use std::path::PathBuf;
use std::str::FromStr;

use crate::config::{GeneralSettingsUpdate, WeatherProfileUpdate};
use crate::{ConfigStore, MusicConfigError, Result};

/// A single raw user edit, usually written as `field=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub field: String,
    pub value: String,
}

impl FieldEdit {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl FromStr for FieldEdit {
    type Err = MusicConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let (field, value) = s
            .split_once('=')
            .ok_or_else(|| MusicConfigError::msg(format!("expected field=value, got `{s}`")))?;
        let field = field.trim();
        if field.is_empty() {
            return Err(MusicConfigError::msg(format!("missing field name in `{s}`")));
        }
        Ok(Self::new(field, value.trim()))
    }
}

/// Outcome of an edit batch. Rejected fields were dropped; the rest were
/// applied.
#[derive(Debug, Default)]
pub struct EditReport {
    pub applied: Vec<String>,
    pub rejected: Vec<MusicConfigError>,
}

impl EditReport {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Drives a sequence of store calls on behalf of a user.
#[derive(Debug)]
pub struct EditSession<'a> {
    store: &'a mut ConfigStore,
}

impl<'a> EditSession<'a> {
    pub fn new(store: &'a mut ConfigStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ConfigStore {
        &*self.store
    }

    /// Applies the valid subset of `edits` to an existing profile.
    ///
    /// Nothing is written when every edit was rejected or `edits` is empty.
    pub fn edit_weather(&mut self, name: &str, edits: &[FieldEdit]) -> Result<EditReport> {
        if !self.store.contains_weather(name) {
            return Err(MusicConfigError::not_found("weather class", name));
        }

        let mut update = WeatherProfileUpdate::default();
        let mut report = EditReport::default();
        for edit in edits {
            match self.coerce_profile_field(edit, &mut update) {
                Ok(()) => report.applied.push(edit.field.clone()),
                Err(err) => {
                    tracing::warn!(field = %edit.field, error = %err, "edit dropped");
                    report.rejected.push(err);
                }
            }
        }

        if !update.is_empty() {
            self.store.update_weather_profile(name, &update)?;
        }
        Ok(report)
    }

    /// Copies `template` into a new profile called `name` and persists it.
    ///
    /// Unlike [`ConfigStore::add_weather_profile`] this refuses to replace an
    /// existing profile.
    pub fn add_weather_from_template(&mut self, name: &str, template: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MusicConfigError::msg("weather class name cannot be empty"));
        }
        if self.store.contains_weather(name) {
            return Err(MusicConfigError::msg(format!(
                "weather class `{name}` already exists"
            )));
        }
        if !self.store.contains_weather(template) {
            return Err(MusicConfigError::not_found("weather class", template));
        }

        let mut profile = self.store.weather_profile(template).clone();
        profile.mood = format!("custom mood for {name}");
        self.store.add_weather_profile(name, profile)
    }

    pub fn edit_general_settings(&mut self, edits: &[FieldEdit]) -> Result<EditReport> {
        let mut update = GeneralSettingsUpdate::default();
        let mut report = EditReport::default();
        for edit in edits {
            match coerce_settings_field(edit, &mut update) {
                Ok(()) => report.applied.push(edit.field.clone()),
                Err(err) => {
                    tracing::warn!(field = %edit.field, error = %err, "edit dropped");
                    report.rejected.push(err);
                }
            }
        }

        if !update.is_empty() {
            self.store.update_general_settings(&update)?;
        }
        Ok(report)
    }

    pub fn export(&self, filename: &str) -> Result<PathBuf> {
        self.store.export_document(filename)
    }

    fn coerce_profile_field(
        &self,
        edit: &FieldEdit,
        update: &mut WeatherProfileUpdate,
    ) -> Result<()> {
        let FieldEdit { field, value } = edit;
        match field.as_str() {
            "base_note" => update.base_note = Some(parse_midi(field, value)?),
            "velocity" => update.velocity = Some(parse_midi(field, value)?),
            "instrument" => update.instrument = Some(parse_midi(field, value)?),
            "tempo" => {
                let tempo: u32 = parse_number(field, value)?;
                if tempo == 0 {
                    return Err(MusicConfigError::invalid_value(field, value));
                }
                update.tempo = Some(tempo);
            }
            "chord_type" => {
                if !self.store.has_chord_type(value) {
                    return Err(MusicConfigError::invalid_value(field, value));
                }
                update.chord_type = Some(value.clone());
            }
            "scale" | "scale_name" => {
                if !self.store.has_scale(value) {
                    return Err(MusicConfigError::invalid_value(field, value));
                }
                update.scale = Some(self.store.scale(value).to_vec());
                update.scale_name = Some(value.clone());
            }
            _ => return Err(MusicConfigError::UnknownField(field.clone())),
        }
        Ok(())
    }
}

fn coerce_settings_field(edit: &FieldEdit, update: &mut GeneralSettingsUpdate) -> Result<()> {
    let FieldEdit { field, value } = edit;
    match field.as_str() {
        "sequence_length" => update.sequence_length = Some(parse_number(field, value)?),
        "feature_dim" => update.feature_dim = Some(parse_number(field, value)?),
        "smoothing_window" => update.smoothing_window = Some(parse_number(field, value)?),
        "default_duration" => update.default_duration = Some(parse_number(field, value)?),
        "beat_subdivision" => update.beat_subdivision = Some(parse_number(field, value)?),
        "chord_duration" => update.chord_duration = Some(parse_float(field, value)?),
        "melody_duration" => update.melody_duration = Some(parse_float(field, value)?),
        "confidence_threshold" => {
            let threshold = parse_float(field, value)?;
            if !(0.0..=1.0).contains(&threshold) {
                return Err(MusicConfigError::invalid_value(field, value));
            }
            update.confidence_threshold = Some(threshold);
        }
        "transition_smoothing" => update.transition_smoothing = Some(parse_flag(field, value)?),
        _ => return Err(MusicConfigError::UnknownField(field.clone())),
    }
    Ok(())
}

fn parse_number<T: FromStr>(field: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MusicConfigError::invalid_value(field, value))
}

// MIDI data bytes stop at 127.
fn parse_midi(field: &str, value: &str) -> Result<u8> {
    let parsed: u8 = parse_number(field, value)?;
    if parsed > 127 {
        return Err(MusicConfigError::invalid_value(field, value));
    }
    Ok(parsed)
}

fn parse_float(field: &str, value: &str) -> Result<f64> {
    let parsed: f64 = parse_number(field, value)?;
    if !parsed.is_finite() {
        return Err(MusicConfigError::invalid_value(field, value));
    }
    Ok(parsed)
}

fn parse_flag(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" => Ok(true),
        "n" | "no" | "false" => Ok(false),
        _ => Err(MusicConfigError::invalid_value(field, value)),
    }
}
