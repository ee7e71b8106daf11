use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const PHASE_TICK: Duration = Duration::from_secs(1);
pub const LONG_BREAK_EVERY: u32 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Work => "Work Time",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, Self::Work)
    }
}

/// Work / short break / long break lengths. Fixed for a session once started.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DurationPreset {
    #[serde(rename = "25-5")]
    Classic,
    #[serde(rename = "40-10")]
    Extended,
}

impl DurationPreset {
    pub fn key(self) -> &'static str {
        match self {
            Self::Classic => "25-5",
            Self::Extended => "40-10",
        }
    }

    pub fn work_seconds(self) -> i64 {
        match self {
            Self::Classic => 25 * 60,
            Self::Extended => 40 * 60,
        }
    }

    pub fn short_break_seconds(self) -> i64 {
        match self {
            Self::Classic => 5 * 60,
            Self::Extended => 10 * 60,
        }
    }

    pub fn long_break_seconds(self) -> i64 {
        30 * 60
    }
}

impl fmt::Display for DurationPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DurationPreset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "25-5" | "25/5" => Ok(Self::Classic),
            "40-10" | "40/10" => Ok(Self::Extended),
            other => Err(format!("unknown preset '{other}' (expected 25-5 or 40-10)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Counting,
    BreakStarted(Phase),
    WorkStarted,
}

/// Countdown for one session: current phase, completed work phases and the
/// seconds left in the phase.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PhaseClock {
    preset: DurationPreset,
    phase: Phase,
    cycle_count: u32,
    remaining_seconds: i64,
}

impl PhaseClock {
    pub fn new(preset: DurationPreset) -> Self {
        Self {
            preset,
            phase: Phase::Work,
            cycle_count: 0,
            remaining_seconds: preset.work_seconds(),
        }
    }

    pub fn preset(&self) -> DurationPreset {
        self.preset
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    pub fn remaining_seconds(&self) -> i64 {
        self.remaining_seconds
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.remaining_seconds -= 1;
        if self.remaining_seconds >= 0 {
            return TickOutcome::Counting;
        }

        match self.phase {
            Phase::Work => {
                self.cycle_count += 1;
                if self.cycle_count % LONG_BREAK_EVERY == 0 {
                    self.phase = Phase::LongBreak;
                    self.remaining_seconds = self.preset.long_break_seconds();
                } else {
                    self.phase = Phase::ShortBreak;
                    self.remaining_seconds = self.preset.short_break_seconds();
                }
                TickOutcome::BreakStarted(self.phase)
            }
            Phase::ShortBreak | Phase::LongBreak => {
                self.phase = Phase::Work;
                self.remaining_seconds = self.preset.work_seconds();
                TickOutcome::WorkStarted
            }
        }
    }

    /// `MM:SS` countdown text.
    pub fn display(&self) -> String {
        let remaining = self.remaining_seconds.max(0);
        format!("{:02}:{:02}", remaining / 60, remaining % 60)
    }
}

/// `m:ss` for playback positions.
pub fn format_clock_ms(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}
