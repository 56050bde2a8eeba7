use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Weather category used whenever a lookup misses.
pub const FALLBACK_WEATHER: &str = "Sunny";
/// Scale and chord table entry used whenever a lookup misses.
pub const FALLBACK_TABLE_KEY: &str = "major";

pub type InstrumentLibrary = BTreeMap<u8, String>;
pub type ScaleTable = BTreeMap<String, Vec<u8>>;
pub type ChordTypeTable = BTreeMap<String, Vec<u8>>;

/// Musical parameters assigned to a single weather category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherProfile {
    pub base_note: u8,
    pub scale: Vec<u8>,
    pub scale_name: String,
    pub chord_type: String,
    pub tempo: u32,
    pub velocity: u8,
    pub instrument: u8,
    pub instrument_name: String,
    pub octave_range: Vec<u8>,
    pub rhythm_pattern: Vec<u8>,
    pub mood: String,
}

/// Pipeline-wide tunables shared by every weather category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
    pub sequence_length: u32,
    pub feature_dim: u32,
    pub smoothing_window: u32,
    pub default_duration: u32,
    pub beat_subdivision: u32,
    pub chord_duration: f64,
    pub melody_duration: f64,
    pub transition_smoothing: bool,
    pub confidence_threshold: f64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            sequence_length: 20,
            feature_dim: 9,
            smoothing_window: 5,
            default_duration: 30,
            beat_subdivision: 8,
            chord_duration: 1.0,
            melody_duration: 0.5,
            transition_smoothing: true,
            confidence_threshold: 0.6,
        }
    }
}

/// The persisted aggregate. One document maps to one file on disk.
///
/// Instrument program numbers are integers in memory; `serde_json` writes
/// them as string keys and parses them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationDocument {
    pub weather_mappings: BTreeMap<String, WeatherProfile>,
    pub general_settings: GeneralSettings,
    pub instrument_library: InstrumentLibrary,
    pub scales: ScaleTable,
    pub chord_types: ChordTypeTable,
}

impl Default for ConfigurationDocument {
    fn default() -> Self {
        defaults()
    }
}

impl ConfigurationDocument {
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Partial update for a [`WeatherProfile`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherProfileUpdate {
    pub base_note: Option<u8>,
    pub scale: Option<Vec<u8>>,
    pub scale_name: Option<String>,
    pub chord_type: Option<String>,
    pub tempo: Option<u32>,
    pub velocity: Option<u8>,
    pub instrument: Option<u8>,
    pub instrument_name: Option<String>,
    pub octave_range: Option<Vec<u8>>,
    pub rhythm_pattern: Option<Vec<u8>>,
    pub mood: Option<String>,
}

impl WeatherProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Names of the fields this update will overwrite.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut mark = |set: bool, name: &'static str| {
            if set {
                fields.push(name);
            }
        };
        mark(self.base_note.is_some(), "base_note");
        mark(self.scale.is_some(), "scale");
        mark(self.scale_name.is_some(), "scale_name");
        mark(self.chord_type.is_some(), "chord_type");
        mark(self.tempo.is_some(), "tempo");
        mark(self.velocity.is_some(), "velocity");
        mark(self.instrument.is_some(), "instrument");
        mark(self.instrument_name.is_some(), "instrument_name");
        mark(self.octave_range.is_some(), "octave_range");
        mark(self.rhythm_pattern.is_some(), "rhythm_pattern");
        mark(self.mood.is_some(), "mood");
        fields
    }

    pub fn apply_to(&self, profile: &mut WeatherProfile) {
        fn merge<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }

        merge(&mut profile.base_note, &self.base_note);
        merge(&mut profile.scale, &self.scale);
        merge(&mut profile.scale_name, &self.scale_name);
        merge(&mut profile.chord_type, &self.chord_type);
        merge(&mut profile.tempo, &self.tempo);
        merge(&mut profile.velocity, &self.velocity);
        merge(&mut profile.instrument, &self.instrument);
        merge(&mut profile.instrument_name, &self.instrument_name);
        merge(&mut profile.octave_range, &self.octave_range);
        merge(&mut profile.rhythm_pattern, &self.rhythm_pattern);
        merge(&mut profile.mood, &self.mood);
    }
}

/// Partial update for [`GeneralSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeneralSettingsUpdate {
    pub sequence_length: Option<u32>,
    pub feature_dim: Option<u32>,
    pub smoothing_window: Option<u32>,
    pub default_duration: Option<u32>,
    pub beat_subdivision: Option<u32>,
    pub chord_duration: Option<f64>,
    pub melody_duration: Option<f64>,
    pub transition_smoothing: Option<bool>,
    pub confidence_threshold: Option<f64>,
}

impl GeneralSettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, settings: &mut GeneralSettings) {
        fn merge<T: Copy>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        merge(&mut settings.sequence_length, self.sequence_length);
        merge(&mut settings.feature_dim, self.feature_dim);
        merge(&mut settings.smoothing_window, self.smoothing_window);
        merge(&mut settings.default_duration, self.default_duration);
        merge(&mut settings.beat_subdivision, self.beat_subdivision);
        merge(&mut settings.chord_duration, self.chord_duration);
        merge(&mut settings.melody_duration, self.melody_duration);
        merge(&mut settings.transition_smoothing, self.transition_smoothing);
        merge(&mut settings.confidence_threshold, self.confidence_threshold);
    }
}

/// Builds the canonical document used to seed a fresh store.
///
/// This is the only place default values are written down; everything else
/// that needs a default asks for this document.
pub fn defaults() -> ConfigurationDocument {
    let weather_mappings = [
        (
            "Sunny",
            profile(
                60,
                &[0, 2, 4, 5, 7, 9, 11],
                "C Major",
                "major",
                (120, 80),
                (1, "Acoustic Grand Piano"),
                &[4, 5, 6],
                &[1, 0, 1, 0, 1, 0, 1, 0],
                "bright and uplifting",
            ),
        ),
        (
            "Rainy",
            profile(
                57,
                &[0, 2, 3, 5, 7, 8, 10],
                "A Minor",
                "minor",
                (90, 60),
                (4, "Electric Piano"),
                &[3, 4, 5],
                &[1, 0, 0, 1, 0, 1, 0, 0],
                "melancholic and flowing",
            ),
        ),
        (
            "Stormy",
            profile(
                55,
                &[0, 1, 3, 5, 6, 8, 10],
                "G Phrygian",
                "diminished",
                (140, 110),
                (33, "Electric Bass"),
                &[2, 3, 4],
                &[1, 1, 0, 1, 1, 0, 1, 1],
                "intense and dramatic",
            ),
        ),
        (
            "Windy",
            profile(
                62,
                &[0, 2, 4, 6, 7, 9, 11],
                "D Lydian",
                "sus4",
                (110, 70),
                (73, "Flute"),
                &[4, 5, 6, 7],
                &[1, 0, 1, 1, 0, 1, 0, 1],
                "ethereal and floating",
            ),
        ),
    ]
    .into_iter()
    .map(|(name, profile)| (name.to_string(), profile))
    .collect();

    ConfigurationDocument {
        weather_mappings,
        general_settings: GeneralSettings::default(),
        instrument_library: INSTRUMENTS
            .iter()
            .map(|&(program, name)| (program, name.to_string()))
            .collect(),
        scales: table(SCALES),
        chord_types: table(CHORD_TYPES),
    }
}

#[allow(clippy::too_many_arguments)]
fn profile(
    base_note: u8,
    scale: &[u8],
    scale_name: &str,
    chord_type: &str,
    (tempo, velocity): (u32, u8),
    (instrument, instrument_name): (u8, &str),
    octave_range: &[u8],
    rhythm_pattern: &[u8],
    mood: &str,
) -> WeatherProfile {
    WeatherProfile {
        base_note,
        scale: scale.to_vec(),
        scale_name: scale_name.to_string(),
        chord_type: chord_type.to_string(),
        tempo,
        velocity,
        instrument,
        instrument_name: instrument_name.to_string(),
        octave_range: octave_range.to_vec(),
        rhythm_pattern: rhythm_pattern.to_vec(),
        mood: mood.to_string(),
    }
}

fn table(entries: &[(&str, &[u8])]) -> BTreeMap<String, Vec<u8>> {
    entries
        .iter()
        .map(|(name, offsets)| (name.to_string(), offsets.to_vec()))
        .collect()
}

// Programs 9-24 are not part of the library.
const INSTRUMENTS: &[(u8, &str)] = &[
    (1, "Acoustic Grand Piano"),
    (2, "Bright Acoustic Piano"),
    (3, "Electric Grand Piano"),
    (4, "Honky-tonk Piano"),
    (5, "Electric Piano 1"),
    (6, "Electric Piano 2"),
    (7, "Harpsichord"),
    (8, "Clavinet"),
    (25, "Acoustic Guitar (nylon)"),
    (26, "Acoustic Guitar (steel)"),
    (27, "Electric Guitar (jazz)"),
    (28, "Electric Guitar (clean)"),
    (29, "Electric Guitar (muted)"),
    (30, "Overdriven Guitar"),
    (31, "Distortion Guitar"),
    (32, "Guitar Harmonics"),
    (33, "Acoustic Bass"),
    (34, "Electric Bass (finger)"),
    (35, "Electric Bass (pick)"),
    (36, "Fretless Bass"),
    (37, "Slap Bass 1"),
    (38, "Slap Bass 2"),
    (39, "Synth Bass 1"),
    (40, "Synth Bass 2"),
    (41, "Violin"),
    (42, "Viola"),
    (43, "Cello"),
    (44, "Contrabass"),
    (45, "Tremolo Strings"),
    (46, "Pizzicato Strings"),
    (47, "Orchestral Harp"),
    (48, "Timpani"),
    (49, "String Ensemble 1"),
    (50, "String Ensemble 2"),
    (51, "SynthStrings 1"),
    (52, "SynthStrings 2"),
    (53, "Choir Aahs"),
    (54, "Voice Oohs"),
    (55, "Synth Voice"),
    (56, "Orchestra Hit"),
    (57, "Trumpet"),
    (58, "Trombone"),
    (59, "Tuba"),
    (60, "Muted Trumpet"),
    (61, "French Horn"),
    (62, "Brass Section"),
    (63, "SynthBrass 1"),
    (64, "SynthBrass 2"),
    (65, "Soprano Sax"),
    (66, "Alto Sax"),
    (67, "Tenor Sax"),
    (68, "Baritone Sax"),
    (69, "Oboe"),
    (70, "English Horn"),
    (71, "Bassoon"),
    (72, "Clarinet"),
    (73, "Piccolo"),
    (74, "Flute"),
    (75, "Recorder"),
    (76, "Pan Flute"),
    (77, "Blown Bottle"),
    (78, "Shakuhachi"),
    (79, "Whistle"),
    (80, "Ocarina"),
    (81, "Lead 1 (square)"),
    (82, "Lead 2 (sawtooth)"),
    (83, "Lead 3 (calliope)"),
    (84, "Lead 4 (chiff)"),
    (85, "Lead 5 (charang)"),
    (86, "Lead 6 (voice)"),
    (87, "Lead 7 (fifths)"),
    (88, "Lead 8 (bass + lead)"),
    (89, "Pad 1 (new age)"),
    (90, "Pad 2 (warm)"),
    (91, "Pad 3 (polysynth)"),
    (92, "Pad 4 (choir)"),
    (93, "Pad 5 (bowed)"),
    (94, "Pad 6 (metallic)"),
    (95, "Pad 7 (halo)"),
    (96, "Pad 8 (sweep)"),
];

const SCALES: &[(&str, &[u8])] = &[
    ("major", &[0, 2, 4, 5, 7, 9, 11]),
    ("minor", &[0, 2, 3, 5, 7, 8, 10]),
    ("dorian", &[0, 2, 3, 5, 7, 9, 10]),
    ("phrygian", &[0, 1, 3, 5, 7, 8, 10]),
    ("lydian", &[0, 2, 4, 6, 7, 9, 11]),
    ("mixolydian", &[0, 2, 4, 5, 7, 9, 10]),
    ("locrian", &[0, 1, 3, 5, 6, 8, 10]),
    ("harmonic_minor", &[0, 2, 3, 5, 7, 8, 11]),
    ("melodic_minor", &[0, 2, 3, 5, 7, 9, 11]),
    ("pentatonic_major", &[0, 2, 4, 7, 9]),
    ("pentatonic_minor", &[0, 3, 5, 7, 10]),
    ("blues", &[0, 3, 5, 6, 7, 10]),
    ("chromatic", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]),
];

const CHORD_TYPES: &[(&str, &[u8])] = &[
    ("major", &[0, 4, 7]),
    ("minor", &[0, 3, 7]),
    ("diminished", &[0, 3, 6]),
    ("augmented", &[0, 4, 8]),
    ("sus2", &[0, 2, 7]),
    ("sus4", &[0, 5, 7]),
    ("major7", &[0, 4, 7, 11]),
    ("minor7", &[0, 3, 7, 10]),
    ("dominant7", &[0, 4, 7, 10]),
    ("diminished7", &[0, 3, 6, 9]),
    ("major9", &[0, 4, 7, 11, 14]),
    ("minor9", &[0, 3, 7, 10, 14]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_expected_shape() {
        let doc = defaults();

        let names: Vec<_> = doc.weather_mappings.keys().map(String::as_str).collect();
        assert_eq!(names, ["Rainy", "Stormy", "Sunny", "Windy"]);
        assert_eq!(doc.instrument_library.len(), 80);
        assert_eq!(doc.scales.len(), 13);
        assert_eq!(doc.chord_types.len(), 12);
        assert!(doc.scales.contains_key(FALLBACK_TABLE_KEY));
        assert!(doc.chord_types.contains_key(FALLBACK_TABLE_KEY));
    }

    #[test]
    fn instrument_library_keeps_program_gap() {
        let doc = defaults();
        assert!((9..=24).all(|p| !doc.instrument_library.contains_key(&p)));
        assert_eq!(doc.instrument_library[&8], "Clavinet");
        assert_eq!(doc.instrument_library[&25], "Acoustic Guitar (nylon)");
    }

    #[test]
    fn defaults_are_deterministic() {
        assert_eq!(defaults(), defaults());
        assert_eq!(ConfigurationDocument::default(), defaults());
    }

    #[test]
    fn instrument_keys_are_strings_on_disk() {
        let json = defaults().to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["instrument_library"]["33"], "Acoustic Bass");
        assert_eq!(value["weather_mappings"]["Sunny"]["tempo"], 120);

        let parsed = ConfigurationDocument::from_json(&json).unwrap();
        assert_eq!(parsed, defaults());
    }

    #[test]
    fn profile_update_touches_only_given_fields() {
        let mut profile = defaults().weather_mappings["Sunny"].clone();
        let before = profile.clone();
        let update = WeatherProfileUpdate {
            tempo: Some(100),
            ..Default::default()
        };

        update.apply_to(&mut profile);

        assert_eq!(profile.tempo, 100);
        assert_eq!(
            WeatherProfile {
                tempo: before.tempo,
                ..profile
            },
            before
        );
        assert_eq!(update.fields(), ["tempo"]);
    }

    #[test]
    fn settings_update_merges() {
        let mut settings = GeneralSettings::default();
        let update = GeneralSettingsUpdate {
            smoothing_window: Some(7),
            transition_smoothing: Some(false),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut settings);

        assert_eq!(settings.smoothing_window, 7);
        assert!(!settings.transition_smoothing);
        assert_eq!(settings.sequence_length, 20);
    }
}
