//! AT settings and mode state machine
//!
//! Tests assume a known AT baseline (e.g. NVDA in browse mode), so the
//! required state is forced before a command runs. Each vendor has its own
//! quirks for getting there, and the only confirmation channel is the AT's
//! own speech.

use std::time::Duration;

use serde_json::{json, Value};

use crate::atdriver::{AtDriverClient, VendorSetting};
use crate::common::{Error, Result};
use crate::keys::{Chord, Key, KeySequence};

use super::collector::collect_speech;

/// Closed set of ATs this harness knows how to drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtVendor {
    Nvda,
    VoiceOver,
    /// No AT identified; settings are assumed irrelevant.
    Unknown,
    /// An identified AT with no settings support.
    Other(String),
}

impl AtVendor {
    pub fn from_name(name: &str) -> Self {
        match name {
            "" => Self::Unknown,
            "NVDA" => Self::Nvda,
            "VoiceOver" => Self::VoiceOver,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A two-state toggle can start in either state, so the chord is tried at
/// most twice. Not a general retry policy.
const TOGGLE_ATTEMPTS: usize = 2;

/// NVDA beeps instead of speaking the mode name unless this is off.
const NVDA_AUDIO_INDICATION: &str = "virtualBuffers.passThroughAudioIndication";
const NVDA_SETTINGS_METHOD: &str = "nvda:settings.setSettings";

/// Drives AT settings over a live client.
pub struct SettingsDriver<'a> {
    client: &'a AtDriverClient,
    mode_switch_debounce: Duration,
}

impl<'a> SettingsDriver<'a> {
    pub fn new(client: &'a AtDriverClient, mode_switch_debounce: Duration) -> Self {
        Self {
            client,
            mode_switch_debounce,
        }
    }

    /// Force the AT into the named settings state before a command runs.
    pub async fn ensure_settings(&self, vendor: &AtVendor, settings: &str) -> Result<()> {
        match vendor {
            AtVendor::Unknown => Ok(()),
            AtVendor::Nvda => self.ensure_nvda_settings(settings).await,
            AtVendor::VoiceOver => self.ensure_voiceover_settings(settings).await,
            AtVendor::Other(name) => Err(Error::SettingsNotSupported { at: name.clone() }),
        }
    }

    /// Legacy reading/interaction mode, translated to settings names for
    /// NVDA. Other ATs have no equivalent and ignore it.
    pub async fn ensure_mode(&self, vendor: &AtVendor, mode: &str) -> Result<()> {
        match vendor {
            AtVendor::Nvda => {
                let settings = match mode {
                    "reading" => "browseMode",
                    "interaction" => "focusMode",
                    other => return Err(Error::unknown_settings("NVDA", other)),
                };
                self.ensure_settings(&AtVendor::Nvda, settings).await
            }
            _ => Ok(()),
        }
    }

    async fn ensure_nvda_settings(&self, settings: &str) -> Result<()> {
        let desired = match settings {
            "browseMode" => "Browse mode",
            "focusMode" => "Focus mode",
            other => return Err(Error::unknown_settings("NVDA", other)),
        };

        // Mode announcements are beeps unless audio indication is off.
        self.set_nvda_setting(NVDA_AUDIO_INDICATION, json!(false))
            .await?;

        let toggle = KeySequence::from(Chord::new(vec![Key::new("insert"), Key::new("space")]));
        let outcome = self.press_keys_to_toggle_setting(&toggle, desired).await;

        // Restore the audio indication whether or not the toggle worked.
        let restore = self.set_nvda_setting(NVDA_AUDIO_INDICATION, json!(true)).await;

        outcome.and(restore)
    }

    async fn ensure_voiceover_settings(&self, settings: &str) -> Result<()> {
        if settings == "defaultMode" {
            return Ok(());
        }
        let (chord, desired) = match settings {
            "quickNavOn" => (quick_nav_chord(), "quick nav on"),
            "quickNavOff" => (quick_nav_chord(), "quick nav off"),
            "arrowQuickKeyNavOn" => (quick_nav_chord(), "arrow quick key nav on"),
            "arrowQuickKeyNavOff" => (quick_nav_chord(), "arrow quick key nav off"),
            "singleQuickKeyNavOn" => (quick_nav_chord(), "single quick key nav on"),
            "singleQuickKeyNavOff" => (quick_nav_chord(), "single quick key nav off"),
            other => return Err(Error::unknown_settings("VoiceOver", other)),
        };
        self.press_keys_to_toggle_setting(&KeySequence::from(chord), desired)
            .await
    }

    async fn set_nvda_setting(&self, name: &str, value: Value) -> Result<()> {
        self.client
            .set_vendor_settings(
                NVDA_SETTINGS_METHOD,
                &[VendorSetting {
                    name: name.to_string(),
                    value,
                }],
            )
            .await
    }

    /// Send the toggle chord and scan captured speech for the confirmation
    /// phrase, case-insensitively. A match returns immediately; otherwise
    /// the chord is tried again to cover the toggle's other starting state,
    /// and exhausting both attempts fails with every unmatched line heard.
    pub async fn press_keys_to_toggle_setting(
        &self,
        sequence: &KeySequence,
        desired_response: &str,
    ) -> Result<()> {
        let desired = desired_response.to_lowercase();
        let mut unmatched = Vec::new();

        for attempt in 1..=TOGGLE_ATTEMPTS {
            let ((), spoken) = collect_speech(
                self.client.speeches(),
                self.mode_switch_debounce,
                self.client.send_keys(sequence),
            )
            .await?;

            for line in spoken {
                if line.to_lowercase().contains(&desired) {
                    tracing::debug!(attempt, setting = desired_response, "setting confirmed");
                    return Ok(());
                }
                unmatched.push(line);
            }
            tracing::debug!(attempt, setting = desired_response, "toggle not confirmed");
        }

        Err(Error::ToggleFailed {
            desired: desired_response.to_string(),
            spoken: unmatched,
        })
    }
}

fn quick_nav_chord() -> Chord {
    Chord::new(vec![Key::new("left"), Key::new("right")])
}
