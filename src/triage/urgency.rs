use serde::{Deserialize, Serialize};
use std::fmt;

/// Caesarean urgency tier. Lower numbers go first on the board.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i32", into = "i32")]
pub enum Urgency {
    Immediate = 1,
    Urgent = 2,
    Early = 3,
    #[default]
    Cold = 4,
    Elective = 5,
}

impl Urgency {
    pub const ALL: [Urgency; 5] = [
        Urgency::Immediate,
        Urgency::Urgent,
        Urgency::Early,
        Urgency::Cold,
        Urgency::Elective,
    ];

    pub fn level(self) -> i32 {
        self as i32
    }

    pub fn from_level(level: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.level() == level)
    }

    pub fn label(self) -> &'static str {
        match self {
            Urgency::Immediate => "Immediate",
            Urgency::Urgent => "Urgent",
            Urgency::Early => "Early",
            Urgency::Cold => "Cold",
            Urgency::Elective => "Elective",
        }
    }

    pub fn colour(self) -> &'static str {
        match self {
            Urgency::Immediate => "Red",
            Urgency::Urgent => "Orange",
            Urgency::Early => "Yellow",
            Urgency::Cold => "Green",
            Urgency::Elective => "Blue",
        }
    }

    /// Parses the raw level sent by a flow or form ("1".."5").
    pub fn parse(raw: &str) -> Result<Self, String> {
        raw.trim()
            .parse::<i32>()
            .ok()
            .and_then(Self::from_level)
            .ok_or_else(|| "Urgency must be a number from 1 to 5".to_string())
    }
}

impl TryFrom<i32> for Urgency {
    type Error = String;

    fn try_from(level: i32) -> Result<Self, Self::Error> {
        Self::from_level(level).ok_or_else(|| format!("Unknown urgency level {}", level))
    }
}

impl From<Urgency> for i32 {
    fn from(urgency: Urgency) -> Self {
        urgency.level()
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_defined_level() {
        for (raw, expected) in [("1", Urgency::Immediate), (" 3 ", Urgency::Early), ("5", Urgency::Elective)] {
            assert_eq!(Urgency::parse(raw), Ok(expected));
        }
    }

    #[test]
    fn rejects_unknown_levels() {
        assert!(Urgency::parse("0").is_err());
        assert!(Urgency::parse("6").is_err());
        assert!(Urgency::parse("urgent").is_err());
    }

    #[test]
    fn colours_follow_severity() {
        assert_eq!(Urgency::Immediate.colour(), "Red");
        assert_eq!(Urgency::default().colour(), "Green");
        assert!(Urgency::Immediate < Urgency::Elective);
    }
}
