//! Key model for AT interactions
//!
//! A [`Key`] is a single key with its protocol-level mapping, a [`Chord`]
//! is keys pressed simultaneously, and a [`KeySequence`] is an ordered list
//! of chords sent to the AT one at a time. All three are immutable once
//! constructed.

mod table;
pub mod validate;

use std::fmt;

pub(crate) use table::{code_point, split_parts};
pub use validate::{map_keys, validate_command, ValidCommand};

/// A single key: its keypress id and the mapped wire representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    id: String,
    mapped: String,
}

impl Key {
    /// Build a key from a normalized keypress id. Named keys map to their
    /// WebDriver code points; single characters pass through unmapped.
    pub fn new(id: &str) -> Self {
        let mapped = match table::code_point(id) {
            Some(code) => code.to_string(),
            None => id.to_string(),
        };
        Self {
            id: id.to_string(),
            mapped,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Protocol-level value sent in `interaction.pressKeys`.
    pub fn mapped(&self) -> &str {
        &self.mapped
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Keys pressed simultaneously. Always holds at least one key; iteration
/// order is preserved for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord(Vec<Key>);

impl Chord {
    pub fn new(keys: Vec<Key>) -> Self {
        debug_assert!(!keys.is_empty(), "a chord holds at least one key");
        Self(keys)
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    /// Mapped wire values, one per key, in press order.
    pub fn mapped_keys(&self) -> Vec<String> {
        self.0.iter().map(|key| key.mapped.clone()).collect()
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.0.iter().map(Key::id).collect();
        f.write_str(&ids.join("+"))
    }
}

/// An ordered list of chords, sent to the AT one chord at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeySequence(Vec<Chord>);

impl KeySequence {
    pub fn new(chords: Vec<Chord>) -> Self {
        Self(chords)
    }

    /// Concatenate sequences, flattening nesting:
    /// `sequence([sequence([a, b]), c])` equals `sequence([a, b, c])`.
    pub fn sequence<I: IntoIterator<Item = KeySequence>>(parts: I) -> Self {
        Self(parts.into_iter().flat_map(|sequence| sequence.0).collect())
    }

    pub fn chords(&self) -> &[Chord] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Chord> for KeySequence {
    fn from(chord: Chord) -> Self {
        Self(vec![chord])
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chords: Vec<String> = self.0.iter().map(Chord::to_string).collect();
        f.write_str(&chords.join(", "))
    }
}
