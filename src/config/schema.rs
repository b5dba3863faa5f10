use std::collections::BTreeMap;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// Subscription tier the usage limits are measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Plan {
    #[default]
    Pro,
    Max5,
    Max20,
    Custom,
}

/// Numeric limits for one rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanLimits {
    pub tokens: u64,
    pub cost: f64,
    pub messages: u64,
}

impl Plan {
    pub const ALL: [Plan; 4] = [Plan::Pro, Plan::Max5, Plan::Max20, Plan::Custom];

    /// Token limit used for `custom` when there is no history to derive one from.
    pub const CUSTOM_DEFAULT_TOKENS: u64 = 44_000;

    pub fn id(self) -> &'static str {
        match self {
            Plan::Pro => "pro",
            Plan::Max5 => "max5",
            Plan::Max20 => "max20",
            Plan::Custom => "custom",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Plan::Pro => "Pro",
            Plan::Max5 => "Max 5",
            Plan::Max20 => "Max 20",
            Plan::Custom => "Custom",
        }
    }

    /// Fixed limits. For `custom` the token figure is only a fallback; see
    /// `usage::limits::resolve`.
    pub fn limits(self) -> PlanLimits {
        match self {
            Plan::Pro => PlanLimits { tokens: 19_000, cost: 18.0, messages: 250 },
            Plan::Max5 => PlanLimits { tokens: 88_000, cost: 35.0, messages: 1_000 },
            Plan::Max20 => PlanLimits { tokens: 220_000, cost: 140.0, messages: 2_000 },
            Plan::Custom => PlanLimits {
                tokens: Self::CUSTOM_DEFAULT_TOKENS,
                cost: 50.0,
                messages: 250,
            },
        }
    }
}

impl FromStr for Plan {
    type Err = ();

    /// Case-insensitive, ignores surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Plan::ALL
            .into_iter()
            .find(|p| p.id() == wanted)
            .ok_or(())
    }
}

// ---------------------------------------------------------------------------
// Display toggles
// ---------------------------------------------------------------------------

/// A metric that can be shown in the menu bar title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Metric {
    TokenPct,
    Cost,
    CostPct,
    Msg,
    MsgPct,
}

impl Metric {
    /// Title order.
    pub const ALL: [Metric; 5] = [
        Metric::TokenPct,
        Metric::Cost,
        Metric::CostPct,
        Metric::Msg,
        Metric::MsgPct,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Metric::TokenPct => "token_pct",
            Metric::Cost => "cost",
            Metric::CostPct => "cost_pct",
            Metric::Msg => "msg",
            Metric::MsgPct => "msg_pct",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::TokenPct => "Token %",
            Metric::Cost => "Cost ($)",
            Metric::CostPct => "Cost %",
            Metric::Msg => "Messages",
            Metric::MsgPct => "Message %",
        }
    }

    fn on_by_default(self) -> bool {
        matches!(self, Metric::TokenPct | Metric::Cost)
    }
}

impl FromStr for Metric {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Metric::ALL
            .into_iter()
            .find(|m| m.key() == wanted)
            .ok_or(())
    }
}

/// Which title metrics are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySet {
    enabled: [bool; 5],
}

impl Default for DisplaySet {
    fn default() -> Self {
        Self {
            enabled: Metric::ALL.map(Metric::on_by_default),
        }
    }
}

impl DisplaySet {
    fn slot(metric: Metric) -> usize {
        Metric::ALL
            .iter()
            .position(|m| *m == metric)
            .unwrap_or_default()
    }

    pub fn none() -> Self {
        Self { enabled: [false; 5] }
    }

    pub fn is_enabled(&self, metric: Metric) -> bool {
        self.enabled[Self::slot(metric)]
    }

    pub fn set(&mut self, metric: Metric, on: bool) {
        self.enabled[Self::slot(metric)] = on;
    }

    pub fn toggle(&mut self, metric: Metric) {
        let slot = Self::slot(metric);
        self.enabled[slot] = !self.enabled[slot];
    }

    /// Enabled metrics in title order.
    pub fn iter(&self) -> impl Iterator<Item = Metric> + '_ {
        Metric::ALL.into_iter().filter(|m| self.is_enabled(*m))
    }

    pub fn to_map(&self) -> BTreeMap<String, bool> {
        Metric::ALL
            .into_iter()
            .map(|m| (m.key().to_string(), self.is_enabled(m)))
            .collect()
    }

    fn from_map(map: &BTreeMap<String, bool>) -> Self {
        let mut set = Self::default();
        for (key, on) in map {
            if let Ok(metric) = key.parse::<Metric>() {
                set.set(metric, *on);
            }
        }
        set
    }

    /// Legacy list form: listed metrics on, the rest off. An empty or
    /// all-unknown list means defaults.
    fn from_list(list: &[String]) -> Self {
        let metrics: Vec<Metric> = list.iter().filter_map(|k| k.parse().ok()).collect();
        if metrics.is_empty() {
            return Self::default();
        }
        let mut set = Self::none();
        for metric in metrics {
            set.set(metric, true);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// On-disk file
// ---------------------------------------------------------------------------

/// `display` as it may appear on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayField {
    Map(BTreeMap<String, bool>),
    List(Vec<String>),
}

impl DisplayField {
    pub fn resolve(&self) -> DisplaySet {
        match self {
            DisplayField::Map(map) => DisplaySet::from_map(map),
            DisplayField::List(list) => DisplaySet::from_list(list),
        }
    }
}

/// Contents of `widget-config.json`.
///
/// Each key is read leniently: a value of the wrong JSON type is dropped
/// without discarding the rest of the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub display: Option<DisplayField>,
}

impl WidgetConfig {
    /// The stored plan, if present and recognised.
    pub fn plan(&self) -> Option<Plan> {
        self.plan.as_deref().and_then(|p| p.parse().ok())
    }

    pub fn display(&self) -> DisplaySet {
        self.display
            .as_ref()
            .map(DisplayField::resolve)
            .unwrap_or_default()
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
