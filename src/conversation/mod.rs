//! Characters, rosters and the dialogue log

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest display name accepted for a character
pub const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub personality: String,
    /// Comma-separated free text, passed through untouched
    #[serde(default)]
    pub hobbies: String,
}

impl Character {
    pub fn new(
        name: impl Into<String>,
        personality: impl Into<String>,
        hobbies: impl Into<String>,
    ) -> Result<Self, CharacterError> {
        let character = Self {
            name: name.into(),
            personality: personality.into(),
            hobbies: hobbies.into(),
        };
        character.validate()?;
        Ok(character)
    }

    pub fn validate(&self) -> Result<(), CharacterError> {
        if self.name.trim().is_empty() {
            return Err(CharacterError::MissingName);
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(CharacterError::NameTooLong(self.name.chars().count()));
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CharacterError {
    #[error("Character name is required")]
    MissingName,

    #[error("Character name is {0} characters long (max {max})", max = MAX_NAME_LEN)]
    NameTooLong(usize),

    #[error("Both character slots are already filled")]
    RosterFull,

    #[error("Character already exists: {0}")]
    DuplicateName(String),

    #[error("Character pair is incomplete: missing {}", format_slots(.0))]
    MissingCharacterPair(Vec<CharacterSlot>),
}

fn format_slots(slots: &[CharacterSlot]) -> String {
    slots
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterSlot {
    Character1,
    Character2,
}

impl fmt::Display for CharacterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacterSlot::Character1 => f.write_str("character1"),
            CharacterSlot::Character2 => f.write_str("character2"),
        }
    }
}

/// Both characters of a session. Only constructible with both slots filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterPair {
    pub character1: Character,
    pub character2: Character,
}

/// Characters collected during setup, one slot at a time.
///
/// This is what the character store persists; a roster with an empty slot
/// can be stored but never starts a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRoster {
    #[serde(default)]
    pub character1: Option<Character>,
    #[serde(default)]
    pub character2: Option<Character>,
}

impl CharacterRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a character in the first empty slot. Names must differ once trimmed.
    pub fn add(&mut self, character: Character) -> Result<CharacterSlot, CharacterError> {
        character.validate()?;

        let name = character.name.trim();
        let taken = [&self.character1, &self.character2]
            .into_iter()
            .flatten()
            .any(|existing| existing.name.trim() == name);
        if taken {
            return Err(CharacterError::DuplicateName(name.to_string()));
        }

        if self.character1.is_none() {
            self.character1 = Some(character);
            Ok(CharacterSlot::Character1)
        } else if self.character2.is_none() {
            self.character2 = Some(character);
            Ok(CharacterSlot::Character2)
        } else {
            Err(CharacterError::RosterFull)
        }
    }

    pub fn missing_slots(&self) -> Vec<CharacterSlot> {
        let mut missing = Vec::new();
        if self.character1.is_none() {
            missing.push(CharacterSlot::Character1);
        }
        if self.character2.is_none() {
            missing.push(CharacterSlot::Character2);
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.character1.is_some() && self.character2.is_some()
    }

    pub fn into_pair(self) -> Result<CharacterPair, CharacterError> {
        let missing = self.missing_slots();
        match (self.character1, self.character2) {
            (Some(character1), Some(character2)) => {
                // Stored rosters may predate validation
                character1.validate()?;
                character2.validate()?;
                Ok(CharacterPair {
                    character1,
                    character2,
                })
            }
            _ => Err(CharacterError::MissingCharacterPair(missing)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub sender: String,
    pub text: String,
    #[serde(rename = "character")]
    pub slot: CharacterSlot,
}

/// Append-only dialogue history, grown one round (two utterances) at a time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationLog {
    utterances: Vec<Utterance>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one round: character1's reply, then character2's.
    pub fn push_round(&mut self, characters: &CharacterPair, reply1: String, reply2: String) {
        self.utterances.push(Utterance {
            sender: characters.character1.name.clone(),
            text: reply1,
            slot: CharacterSlot::Character1,
        });
        self.utterances.push(Utterance {
            sender: characters.character2.name.clone(),
            text: reply2,
            slot: CharacterSlot::Character2,
        });
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    pub fn rounds(&self) -> usize {
        self.utterances.len() / 2
    }
}
