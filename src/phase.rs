use crate::error::Error;
use std::fmt;
use std::str::FromStr;
use time::macros::date;
use time::{Date, OffsetDateTime, UtcOffset};

/// Collection phase around the tournament.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Pre,
    During,
    Post,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Pre, Phase::During, Phase::Post];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::During => "during",
            Phase::Post => "post",
        }
    }

    /// The fixed calendar window for this phase.
    pub fn window(self) -> PhaseWindow {
        match self {
            Phase::Pre => PhaseWindow { start: date!(2024 - 05 - 15), end: date!(2024 - 06 - 13) },
            Phase::During => PhaseWindow { start: date!(2024 - 06 - 14), end: date!(2024 - 07 - 14) },
            Phase::Post => PhaseWindow { start: date!(2024 - 07 - 15), end: date!(2024 - 08 - 15) },
        }
    }

    /// Which phase (if any) a timestamp belongs to.
    pub fn of(ts: OffsetDateTime) -> Option<Phase> {
        Phase::ALL.into_iter().find(|p| p.window().contains(ts))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pre" | "pre_euro" => Ok(Phase::Pre),
            "during" | "during_euro" => Ok(Phase::During),
            "post" | "post_euro" => Ok(Phase::Post),
            _ => Err(Error::UnknownPhase(s.to_string())),
        }
    }
}

/// Closed UTC date range; both boundary days are included in full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseWindow {
    pub start: Date,
    pub end: Date,
}

impl PhaseWindow {
    /// `None` when `start` is after `end`.
    pub fn new(start: Date, end: Date) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// `start <= ts <= end`, compared at day granularity in UTC.
    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        let day = ts.to_offset(UtcOffset::UTC).date();
        self.start <= day && day <= self.end
    }

    /// True when `ts` falls on a day before the window opens.
    pub fn is_before(&self, ts: OffsetDateTime) -> bool {
        ts.to_offset(UtcOffset::UTC).date() < self.start
    }
}

impl fmt::Display for PhaseWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
