//! Keystroke validation and mapping
//!
//! Keypress ids come from human-authored test plans. Some authoring
//! ambiguity survives into plan files ("A / B", "X or Y", "A followed by
//! B") and must not silently turn into key presses; validation rejects it
//! and aggregates every problem across the whole command. Mapping is a
//! separate pure step that only accepts a validated command.

use crate::testing::plan::Command;

use super::{code_point, split_parts, Chord, Key, KeySequence};

/// A command whose keypress ids all validated: the only input [`map_keys`]
/// accepts.
#[derive(Debug, Clone, Copy)]
pub struct ValidCommand<'a>(&'a Command);

impl<'a> ValidCommand<'a> {
    pub fn command(&self) -> &'a Command {
        self.0
    }
}

/// Check every keypress id of a command, returning it as mappable or the
/// complete list of problems found. Never fail-fast: all errors across all
/// keypresses are reported together.
pub fn validate_command(command: &Command) -> std::result::Result<ValidCommand<'_>, Vec<String>> {
    let mut errors = Vec::new();

    if command.keypresses.is_empty() {
        errors.push(format!("'{}' has no keypresses.", command.id));
    }

    for keypress in &command.keypresses {
        let id = &keypress.id;
        if id.contains('/') {
            errors.push(format!("'{id}' cannot contain '/'."));
        }
        if id.contains('(') || id.contains(')') {
            errors.push(format!("'{id}' cannot contain '(' or ')'."));
        }
        if contains_word(id, "or") {
            errors.push(format!("'{id}' cannot contain 'or'."));
        }
        if contains_word(id, "followed") {
            errors.push(format!("'{id}' cannot contain 'followed'."));
        }
        for part in split_parts(id) {
            if part.chars().count() != 1 && code_point(&part).is_none() {
                errors.push(format!("'{part}' of '{id}' is not a recognized key"));
            }
        }
    }

    if errors.is_empty() {
        Ok(ValidCommand(command))
    } else {
        Err(errors)
    }
}

/// Map a validated command into one key sequence: each keypress id yields
/// one chord (`+` and `_` join simultaneous presses), chords concatenate in
/// keypress order. Deterministic: the same command always maps to the same
/// sequence.
pub fn map_keys(command: &ValidCommand<'_>) -> KeySequence {
    KeySequence::sequence(command.command().keypresses.iter().map(|keypress| {
        let keys = split_parts(&keypress.id)
            .into_iter()
            .map(|part| Key::new(&part))
            .collect();
        KeySequence::from(Chord::new(keys))
    }))
}

fn contains_word(id: &str, word: &str) -> bool {
    id.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|part| part == word)
}
