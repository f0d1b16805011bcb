use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

/// Tournament stage of a match, ordered from first round to final.
///
/// Serialized as its display label ("Quarter Final"). Labels that match no
/// known stage are kept verbatim in [`Round::Unrecognized`] instead of being
/// rejected, so a malformed upstream feed still settles. Non-string values
/// (`null`, numbers, objects) and a missing field are unrecognized too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Round {
    FirstRound,
    SecondRound,
    ThirdRound,
    FourthRound,
    QuarterFinal,
    SemiFinal,
    Final,
    Unrecognized(String),
}

impl Round {
    /// Known stages in tournament order.
    pub const STAGES: [Round; 7] = [
        Round::FirstRound,
        Round::SecondRound,
        Round::ThirdRound,
        Round::FourthRound,
        Round::QuarterFinal,
        Round::SemiFinal,
        Round::Final,
    ];

    pub fn label(&self) -> &str {
        match self {
            Round::FirstRound => "First Round",
            Round::SecondRound => "Second Round",
            Round::ThirdRound => "Third Round",
            Round::FourthRound => "Fourth Round",
            Round::QuarterFinal => "Quarter Final",
            Round::SemiFinal => "Semi Final",
            Round::Final => "Final",
            Round::Unrecognized(raw) => raw,
        }
    }

    /// Zero-based stage index, `None` for unrecognized rounds.
    pub fn stage(&self) -> Option<usize> {
        Self::STAGES.iter().position(|stage| stage == self)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Round::Unrecognized(_))
    }

    fn parse(raw: &str) -> Option<Round> {
        let round = match raw.trim() {
            "First Round" | "FIRST_ROUND" => Round::FirstRound,
            "Second Round" | "SECOND_ROUND" => Round::SecondRound,
            "Third Round" | "THIRD_ROUND" => Round::ThirdRound,
            "Fourth Round" | "FOURTH_ROUND" => Round::FourthRound,
            "Quarter Final" | "QUARTER_FINAL" => Round::QuarterFinal,
            "Semi Final" | "SEMI_FINAL" => Round::SemiFinal,
            "Final" | "FINAL" => Round::Final,
            _ => return None,
        };
        Some(round)
    }
}

impl Default for Round {
    fn default() -> Self {
        Round::Unrecognized(String::new())
    }
}

impl<'de> Deserialize<'de> for Round {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let round = match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(raw) => Round::from(raw),
            serde_json::Value::Null => Round::default(),
            other => Round::Unrecognized(other.to_string()),
        };
        Ok(round)
    }
}

impl From<String> for Round {
    fn from(raw: String) -> Self {
        Round::parse(&raw).unwrap_or(Round::Unrecognized(raw))
    }
}

impl From<&str> for Round {
    fn from(raw: &str) -> Self {
        Round::parse(raw).unwrap_or_else(|| Round::Unrecognized(raw.to_string()))
    }
}

impl From<Round> for String {
    fn from(round: Round) -> Self {
        match round {
            Round::Unrecognized(raw) => raw,
            known => known.label().to_string(),
        }
    }
}

impl Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of a match as delivered by the result feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TennisMatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournament_id: Option<String>,
    #[serde(default)]
    pub round: Round,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
}

impl TennisMatch {
    /// Winner id, ignoring blank values.
    pub fn winner(&self) -> Option<&str> {
        self.winner
            .as_deref()
            .map(str::trim)
            .filter(|winner| !winner.is_empty())
    }
}

/// A single "match updated" delivery: the document before and after the edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchTransition {
    pub before: TennisMatch,
    pub after: TennisMatch,
}

impl MatchTransition {
    pub fn new(before: TennisMatch, after: TennisMatch) -> Self {
        Self { before, after }
    }

    pub fn match_id(&self) -> &str {
        &self.after.id
    }
}
