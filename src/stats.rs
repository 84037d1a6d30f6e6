// Match outcome and points accounting.
//
// Win = 3 points, draw = 1, loss = 0. The biggest win is stored as an
// "F-A" string and only replaced by a strictly larger goal margin.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const POINTS_WIN: i64 = 3;
pub const POINTS_DRAW: i64 = 1;
pub const POINTS_LOSS: i64 = 0;

/// Upper bound on goals per side in a single result.
pub const MAX_GOALS: i64 = 99;

/// Match outcome from perspective of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn from_goals(goals_for: i64, goals_against: i64) -> Self {
        match goals_for.cmp(&goals_against) {
            std::cmp::Ordering::Greater => Outcome::Win,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::Loss,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Draw => "draw",
            Outcome::Loss => "loss",
        }
    }

    pub fn points(self) -> i64 {
        match self {
            Outcome::Win => POINTS_WIN,
            Outcome::Draw => POINTS_DRAW,
            Outcome::Loss => POINTS_LOSS,
        }
    }

    /// (wins, draws, losses) increments for this outcome.
    pub fn tally(self) -> (i64, i64, i64) {
        match self {
            Outcome::Win => (1, 0, 0),
            Outcome::Draw => (0, 1, 0),
            Outcome::Loss => (0, 0, 1),
        }
    }
}

/// One side of a recorded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchLine {
    pub goals_for: i64,
    pub goals_against: i64,
    pub outcome: Outcome,
}

impl MatchLine {
    pub fn new(goals_for: i64, goals_against: i64) -> Self {
        Self {
            goals_for,
            goals_against,
            outcome: Outcome::from_goals(goals_for, goals_against),
        }
    }

    /// Lines for player A and player B of a match.
    pub fn pair(goals_a: i64, goals_b: i64) -> (Self, Self) {
        (Self::new(goals_a, goals_b), Self::new(goals_b, goals_a))
    }

    pub fn points(&self) -> i64 {
        self.outcome.points()
    }

    /// The scoreline as a biggest-win candidate, if this side won.
    pub fn as_win(&self) -> Option<BiggestWin> {
        (self.outcome == Outcome::Win).then_some(BiggestWin {
            goals_for: self.goals_for,
            goals_against: self.goals_against,
        })
    }
}

/// A winning scoreline, stored as "F-A".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiggestWin {
    pub goals_for: i64,
    pub goals_against: i64,
}

impl BiggestWin {
    pub fn margin(&self) -> i64 {
        self.goals_for - self.goals_against
    }

    /// Whether this scoreline should replace the stored one.
    ///
    /// Missing or unparseable stored values never block a new record.
    pub fn beats(&self, stored: Option<&str>) -> bool {
        match stored.and_then(|s| s.parse::<BiggestWin>().ok()) {
            Some(current) => self.margin() > current.margin(),
            None => true,
        }
    }
}

impl fmt::Display for BiggestWin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.goals_for, self.goals_against)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid scoreline: {0:?}")]
pub struct ParseScorelineError(String);

impl FromStr for BiggestWin {
    type Err = ParseScorelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseScorelineError(s.to_string());
        let (f, a) = s.trim().split_once('-').ok_or_else(err)?;
        Ok(BiggestWin {
            goals_for: f.trim().parse().map_err(|_| err())?,
            goals_against: a.trim().parse().map_err(|_| err())?,
        })
    }
}
