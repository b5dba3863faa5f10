//! Session blocks as reported by the analyzer, and their conversion into
//! the snapshot the renderer consumes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use super::{BurnRate, LastSession, LimitNotice, ModelShare, Snapshot, Usage};
use crate::config::PlanLimits;

/// Decode analyzer output: either `{"blocks": [...]}` or a bare array.
///
/// The shape is picked from the parsed value so a malformed block reports
/// its own error rather than a generic shape mismatch.
pub fn parse_report(bytes: &[u8]) -> Result<Vec<Block>, serde_json::Error> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(items) => serde_json::from_value(Value::Array(items)),
        Value::Object(mut report) => match report.remove("blocks") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(blocks) => serde_json::from_value(blocks),
        },
        other => Err(de::Error::custom(format!(
            "expected an object or an array of blocks, found {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `null` reads as the field's default.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Counts may arrive as floats or `null`; negatives read as zero.
fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_count(deserializer)?.unwrap_or(0))
}

fn optional_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.map(to_count))
}

fn to_count(n: f64) -> u64 {
    n.max(0.0).round() as u64
}

/// One five-hour session block. Every field is optional; analyzers differ
/// in what they report.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Block {
    #[serde(deserialize_with = "or_default")]
    pub is_active: bool,
    #[serde(deserialize_with = "or_default")]
    pub is_gap: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub actual_end_time: Option<String>,
    #[serde(deserialize_with = "count")]
    pub total_tokens: u64,
    #[serde(rename = "costUSD", deserialize_with = "or_default")]
    pub cost_usd: f64,
    #[serde(deserialize_with = "optional_count")]
    pub sent_messages_count: Option<u64>,
    pub duration_minutes: Option<f64>,
    pub burn_rate: Option<RawBurnRate>,
    pub projection: Option<RawProjection>,
    #[serde(deserialize_with = "or_default")]
    pub per_model_stats: BTreeMap<String, Value>,
    #[serde(deserialize_with = "or_default")]
    pub limit_messages: Vec<RawLimitMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawBurnRate {
    #[serde(deserialize_with = "or_default")]
    pub tokens_per_minute: f64,
    #[serde(deserialize_with = "or_default")]
    pub cost_per_hour: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawProjection {
    pub remaining_minutes: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLimitMessage {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub reset_time: Option<String>,
}

/// Parse an ISO-8601 timestamp; naive timestamps are taken as UTC.
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|n| n.and_utc())
}

impl Block {
    /// `durationMinutes` if reported, else measured from `startTime`.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> f64 {
        if let Some(minutes) = self.duration_minutes {
            return minutes.max(0.0);
        }
        let Some(start) = self.start_time.as_deref().and_then(parse_time) else {
            return 0.0;
        };
        let end = self
            .actual_end_time
            .as_deref()
            .and_then(parse_time)
            .unwrap_or(now);
        ((end - start).num_seconds().max(0) as f64) / 60.0
    }

    fn burn_rate(&self) -> Option<BurnRate> {
        let raw = self.burn_rate.as_ref()?;
        if raw.tokens_per_minute <= 0.0 && raw.cost_per_hour <= 0.0 {
            return None;
        }
        Some(BurnRate {
            tokens_per_minute: raw.tokens_per_minute,
            cost_per_hour: raw.cost_per_hour,
        })
    }

    /// Per-model token counts, largest first. Entries that are not objects
    /// are skipped.
    fn model_shares(&self) -> Vec<ModelShare> {
        let mut models: Vec<ModelShare> = self
            .per_model_stats
            .iter()
            .filter_map(|(name, stats)| {
                let stats = stats.as_object()?;
                let tokens = stats
                    .get("totalTokens")
                    .or_else(|| stats.get("total_tokens"))
                    .and_then(Value::as_f64)
                    .map_or(0, to_count);
                Some(ModelShare {
                    name: name.clone(),
                    tokens,
                })
            })
            .collect();
        models.sort_by(|a, b| b.tokens.cmp(&a.tokens).then_with(|| a.name.cmp(&b.name)));
        models
    }

    fn limit_notices(&self) -> Vec<LimitNotice> {
        self.limit_messages
            .iter()
            .map(|m| LimitNotice {
                kind: m.kind.clone().unwrap_or_else(|| "unknown".to_string()),
                resets_at: m.reset_time.as_deref().and_then(parse_time),
            })
            .collect()
    }

    pub fn to_snapshot(&self, limits: PlanLimits, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            tokens: self.total_tokens,
            token_limit: limits.tokens,
            cost: self.cost_usd,
            cost_limit: limits.cost,
            messages: self.sent_messages_count,
            message_limit: limits.messages,
            elapsed_minutes: self.elapsed_minutes(now),
            remaining_minutes: self
                .projection
                .as_ref()
                .and_then(|p| p.remaining_minutes)
                .filter(|m| *m > 0.0),
            burn_rate: self.burn_rate(),
            resets_at: self.end_time.as_deref().and_then(parse_time),
            models: self.model_shares(),
            limit_notices: self.limit_notices(),
        }
    }

    pub fn to_last_session(&self, now: DateTime<Utc>) -> LastSession {
        LastSession {
            tokens: self.total_tokens,
            cost: self.cost_usd,
            messages: self.sent_messages_count.unwrap_or(0),
            duration_minutes: self.elapsed_minutes(now),
        }
    }
}

/// Classify the analyzer's blocks. Gap blocks are ignored; the first active
/// block is the current session.
pub fn classify(blocks: &[Block], limits: PlanLimits, now: DateTime<Utc>) -> Usage {
    let mut sessions = blocks.iter().filter(|b| !b.is_gap);
    if let Some(active) = sessions.clone().find(|b| b.is_active) {
        return Usage::Active(active.to_snapshot(limits, now));
    }
    Usage::Idle(sessions.next_back().map(|b| b.to_last_session(now)))
}
