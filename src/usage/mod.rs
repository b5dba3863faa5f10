pub mod blocks;
pub mod command;
pub mod limits;

use chrono::{DateTime, Utc};

pub use command::CommandAnalyzer;

use crate::config::Plan;
use crate::error::FetchError;

/// Source of usage data for one render.
pub trait UsageAnalyzer {
    /// Fetch current usage measured against `plan`'s limits.
    fn fetch(&self, plan: Plan, now: DateTime<Utc>) -> Result<Usage, FetchError>;

    /// Command line of a live view for this analyzer, if it has one.
    fn live_command(&self) -> Option<Vec<String>> {
        None
    }
}

/// What the analyzer saw.
#[derive(Debug, Clone, PartialEq)]
pub enum Usage {
    /// A session block is currently open.
    Active(Snapshot),
    /// No open session. Carries the most recent one, if there was any.
    Idle(Option<LastSession>),
}

/// Metrics for the active session, with the limits they are measured against.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub tokens: u64,
    pub token_limit: u64,
    pub cost: f64,
    pub cost_limit: f64,
    /// Not every analyzer counts messages.
    pub messages: Option<u64>,
    pub message_limit: u64,
    pub elapsed_minutes: f64,
    pub remaining_minutes: Option<f64>,
    pub burn_rate: Option<BurnRate>,
    pub resets_at: Option<DateTime<Utc>>,
    /// Largest first.
    pub models: Vec<ModelShare>,
    pub limit_notices: Vec<LimitNotice>,
}

impl Snapshot {
    pub fn token_ratio(&self) -> f64 {
        ratio(self.tokens as f64, self.token_limit as f64)
    }

    pub fn cost_ratio(&self) -> f64 {
        ratio(self.cost, self.cost_limit)
    }

    pub fn message_ratio(&self) -> f64 {
        ratio(self.messages.unwrap_or(0) as f64, self.message_limit as f64)
    }

    /// The highest of the three usage ratios.
    pub fn peak_ratio(&self) -> f64 {
        self.token_ratio()
            .max(self.cost_ratio())
            .max(self.message_ratio())
    }
}

/// `used / limit`, or 0 when there is no limit.
pub fn ratio(used: f64, limit: f64) -> f64 {
    if limit > 0.0 {
        used / limit
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnRate {
    pub tokens_per_minute: f64,
    pub cost_per_hour: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelShare {
    pub name: String,
    pub tokens: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LimitNotice {
    pub kind: String,
    pub resets_at: Option<DateTime<Utc>>,
}

/// Summary of the last finished session, shown while idle.
#[derive(Debug, Clone, PartialEq)]
pub struct LastSession {
    pub tokens: u64,
    pub cost: f64,
    pub messages: u64,
    pub duration_minutes: f64,
}
