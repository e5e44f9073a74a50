//! Static voice catalog
//!
//! Each profile maps a user-facing label onto one of the prebuilt speech
//! voices. Speaking-rate and pitch hints are informational: the speech model
//! rejects them alongside a prebuilt voice, so they are never sent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Prebuilt voice identities understood by the speech API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceName {
    Zephyr,
    Puck,
    Charon,
    Kore,
    Fenrir,
}

impl VoiceName {
    /// Name as sent in `prebuiltVoiceConfig.voiceName`
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceName::Zephyr => "Zephyr",
            VoiceName::Puck => "Puck",
            VoiceName::Charon => "Charon",
            VoiceName::Kore => "Kore",
            VoiceName::Fenrir => "Fenrir",
        }
    }
}

impl fmt::Display for VoiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoiceName {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zephyr" => Ok(VoiceName::Zephyr),
            "puck" => Ok(VoiceName::Puck),
            "charon" => Ok(VoiceName::Charon),
            "kore" => Ok(VoiceName::Kore),
            "fenrir" => Ok(VoiceName::Fenrir),
            other => Err(Error::InvalidInput(format!("Unknown voice name: {}", other))),
        }
    }
}

/// One selectable entry of the voice catalog
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceProfile {
    /// Unique catalog id
    pub id: &'static str,
    /// Human-readable label
    pub label: &'static str,
    /// Underlying prebuilt voice
    pub voice_name: VoiceName,
    /// Speaking-rate hint (1.0 = normal)
    pub speaking_rate: Option<f32>,
    /// Pitch hint in semitones
    pub pitch: Option<f32>,
}

const fn profile(
    id: &'static str,
    label: &'static str,
    voice_name: VoiceName,
    speaking_rate: f32,
    pitch: f32,
) -> VoiceProfile {
    VoiceProfile {
        id,
        label,
        voice_name,
        speaking_rate: Some(speaking_rate),
        pitch: Some(pitch),
    }
}

/// Ordered voice catalog; the first entry is the default selection
#[rustfmt::skip]
pub const VOICES: &[VoiceProfile] = &[
    profile("zephyr-young-female-indian", "Young Female (Indian Accent, Zephyr)", VoiceName::Zephyr, 1.1, 1.0),
    profile("kore-mature-female-indian", "Mature Female (Indian Accent, Kore)", VoiceName::Kore, 0.9, -0.5),
    profile("puck-young-male-indian", "Young Male (Indian Accent, Puck)", VoiceName::Puck, 1.05, 0.8),
    profile("charon-mature-male-indian", "Mature Male (Indian Accent, Charon)", VoiceName::Charon, 0.95, -0.2),
    profile("fenrir-deep-male-indian", "Deep Male (Indian Accent, Fenrir)", VoiceName::Fenrir, 0.85, -1.0),
    profile("zephyr-child-indian", "Child Voice (Indian Accent, Zephyr)", VoiceName::Zephyr, 1.25, 2.5),
    profile("puck-child-indian", "Child Voice (Indian Accent, Puck)", VoiceName::Puck, 1.2, 2.0),
    profile("kore-old-female-indian", "Elderly Female (Indian Accent, Kore)", VoiceName::Kore, 0.8, -1.0),
    profile("charon-old-male-indian", "Elderly Male (Indian Accent, Charon)", VoiceName::Charon, 0.75, -1.5),
];

/// Look up a catalog entry by id
pub fn find_voice(id: &str) -> Option<&'static VoiceProfile> {
    VOICES.iter().find(|voice| voice.id == id)
}

/// Look up a voice by catalog id, falling back to the first entry using the
/// prebuilt voice of that name (`"kore"`, `"Fenrir"`)
///
/// # Errors
/// `Error::NotFound` when neither matches.
pub fn resolve_voice(query: &str) -> Result<&'static VoiceProfile> {
    if let Some(voice) = find_voice(query) {
        return Ok(voice);
    }
    query
        .parse::<VoiceName>()
        .ok()
        .and_then(|name| VOICES.iter().find(|voice| voice.voice_name == name))
        .ok_or_else(|| Error::NotFound(format!("voice '{}'", query)))
}

/// Default selection (first catalog entry)
pub fn default_voice() -> &'static VoiceProfile {
    &VOICES[0]
}
