use std::fmt;

use serde::Serialize;

use crate::config::ConfigurationDocument;

/// Display projection of a single weather profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub weather: String,
    pub scale_name: String,
    pub instrument_name: String,
    pub tempo: u32,
    pub chord_type: String,
    pub mood: String,
}

/// Read-only report over the whole document, as shown by the editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSummary {
    pub profiles: Vec<ProfileSummary>,
    pub sequence_length: u32,
    pub smoothing_window: u32,
    pub default_duration: u32,
    pub transition_smoothing: bool,
}

impl ConfigSummary {
    pub fn from_document(document: &ConfigurationDocument) -> Self {
        let profiles = document
            .weather_mappings
            .iter()
            .map(|(weather, profile)| ProfileSummary {
                weather: weather.clone(),
                scale_name: profile.scale_name.clone(),
                instrument_name: profile.instrument_name.clone(),
                tempo: profile.tempo,
                chord_type: profile.chord_type.clone(),
                mood: profile.mood.clone(),
            })
            .collect();

        let settings = &document.general_settings;
        Self {
            profiles,
            sequence_length: settings.sequence_length,
            smoothing_window: settings.smoothing_window,
            default_duration: settings.default_duration,
            transition_smoothing: settings.transition_smoothing,
        }
    }
}

impl fmt::Display for ConfigSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "MUSICAL CONFIGURATION SUMMARY")?;
        writeln!(f, "{rule}")?;

        for profile in &self.profiles {
            writeln!(f)?;
            writeln!(f, "{}:", profile.weather.to_uppercase())?;
            writeln!(f, "  Scale: {}", profile.scale_name)?;
            writeln!(f, "  Instrument: {}", profile.instrument_name)?;
            writeln!(f, "  Tempo: {} BPM", profile.tempo)?;
            writeln!(f, "  Chord Type: {}", profile.chord_type)?;
            writeln!(f, "  Mood: {}", profile.mood)?;
        }

        writeln!(f)?;
        writeln!(f, "General Settings:")?;
        writeln!(f, "  Sequence Length: {}", self.sequence_length)?;
        writeln!(f, "  Smoothing Window: {}", self.smoothing_window)?;
        writeln!(f, "  Default Duration: {} seconds", self.default_duration)?;
        write!(f, "  Transition Smoothing: {}", self.transition_smoothing)
    }
}
