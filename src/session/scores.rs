//! Judge score vector

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SessionError;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;
pub const DEFAULT_SCORE: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    Chemistry,
    Engagement,
    Authenticity,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 3] = [
        ScoreCategory::Chemistry,
        ScoreCategory::Engagement,
        ScoreCategory::Authenticity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreCategory::Chemistry => "chemistry",
            ScoreCategory::Engagement => "engagement",
            ScoreCategory::Authenticity => "authenticity",
        }
    }
}

impl fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreCategory {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chemistry" => Ok(ScoreCategory::Chemistry),
            "engagement" => Ok(ScoreCategory::Engagement),
            "authenticity" => Ok(ScoreCategory::Authenticity),
            _ => Err(SessionError::UnknownCategory(s.to_string())),
        }
    }
}

/// Scores in [1, 10]; serialized as `{"chemistry": 5, ...}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeScores {
    chemistry: u8,
    engagement: u8,
    authenticity: u8,
}

impl Default for JudgeScores {
    fn default() -> Self {
        Self {
            chemistry: DEFAULT_SCORE,
            engagement: DEFAULT_SCORE,
            authenticity: DEFAULT_SCORE,
        }
    }
}

impl JudgeScores {
    pub fn get(&self, category: ScoreCategory) -> u8 {
        match category {
            ScoreCategory::Chemistry => self.chemistry,
            ScoreCategory::Engagement => self.engagement,
            ScoreCategory::Authenticity => self.authenticity,
        }
    }

    /// Set a score, rejecting anything outside [1, 10].
    ///
    /// Returns whether the stored value changed.
    pub fn set(&mut self, category: ScoreCategory, value: i64) -> Result<bool, SessionError> {
        if value < MIN_SCORE as i64 || value > MAX_SCORE as i64 {
            return Err(SessionError::ScoreOutOfRange { category, value });
        }
        let value = value as u8;
        let slot = match category {
            ScoreCategory::Chemistry => &mut self.chemistry,
            ScoreCategory::Engagement => &mut self.engagement,
            ScoreCategory::Authenticity => &mut self.authenticity,
        };
        let changed = *slot != value;
        *slot = value;
        Ok(changed)
    }

    pub fn is_default(&self) -> bool {
        ScoreCategory::ALL
            .iter()
            .all(|c| self.get(*c) == DEFAULT_SCORE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_five() {
        let scores = JudgeScores::default();
        for category in ScoreCategory::ALL {
            assert_eq!(scores.get(category), DEFAULT_SCORE);
        }
        assert!(scores.is_default());
    }

    #[test]
    fn test_set_rejects_out_of_range() {
        let mut scores = JudgeScores::default();
        assert!(matches!(
            scores.set(ScoreCategory::Chemistry, 0),
            Err(SessionError::ScoreOutOfRange { value: 0, .. })
        ));
        assert!(matches!(
            scores.set(ScoreCategory::Engagement, 11),
            Err(SessionError::ScoreOutOfRange { value: 11, .. })
        ));
        assert!(scores.is_default());

        assert!(scores.set(ScoreCategory::Authenticity, 10).unwrap());
        assert!(scores.set(ScoreCategory::Chemistry, 1).unwrap());
        assert!(!scores.set(ScoreCategory::Chemistry, 1).unwrap());
        assert!(!scores.is_default());
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(
            "Chemistry".parse::<ScoreCategory>().unwrap(),
            ScoreCategory::Chemistry
        );
        assert!(matches!(
            "charisma".parse::<ScoreCategory>(),
            Err(SessionError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(JudgeScores::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"chemistry": 5, "engagement": 5, "authenticity": 5})
        );
    }
}
