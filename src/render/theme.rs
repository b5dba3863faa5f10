/// Usage ratios at which each tier starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub caution: f64,
    pub warning: f64,
    pub critical: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            caution: 0.50,
            warning: 0.80,
            critical: 0.95,
        }
    }
}

/// Severity of a usage ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Ok,
    Caution,
    Warning,
    Critical,
}

impl Tier {
    /// Boundary values belong to the higher tier. NaN is `Ok`.
    pub fn from_ratio(ratio: f64, thresholds: &Thresholds) -> Self {
        if ratio >= thresholds.critical {
            Tier::Critical
        } else if ratio >= thresholds.warning {
            Tier::Warning
        } else if ratio >= thresholds.caution {
            Tier::Caution
        } else {
            Tier::Ok
        }
    }
}

/// Hex colors understood by SwiftBar's `color=` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub ok: String,
    pub caution: String,
    pub warning: String,
    pub critical: String,
    pub muted: String,
    pub text: String,
    pub dim: String,
    pub label: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            ok: "#6BDB7B".into(),
            caution: "#FFD95C".into(),
            warning: "#FF9F43".into(),
            critical: "#FF6B6B".into(),
            muted: "#8E8E93".into(),
            text: "#FFFFFF".into(),
            dim: "#A0A0A8".into(),
            label: "#B0B0B8".into(),
        }
    }
}

/// Everything about how the menu looks. Built once per render and passed
/// down explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub thresholds: Thresholds,
    pub palette: Palette,
    pub title_font: String,
    pub title_size: u8,
    /// Pixels the title is pushed down to sit centered in the bar.
    pub title_offset: i8,
    pub body_font: String,
    pub body_size: u8,
    pub small_size: u8,
    pub bar_width: usize,
    /// Longest model name shown before it is cut.
    pub model_name_width: usize,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            palette: Palette::default(),
            title_font: "SFMono-Regular".into(),
            title_size: 12,
            title_offset: 2,
            body_font: "SFMono-Regular".into(),
            body_size: 12,
            small_size: 11,
            bar_width: 16,
            model_name_width: 22,
        }
    }
}

impl Theme {
    pub fn tier(&self, ratio: f64) -> Tier {
        Tier::from_ratio(ratio, &self.thresholds)
    }

    pub fn tier_color(&self, tier: Tier) -> &str {
        match tier {
            Tier::Ok => &self.palette.ok,
            Tier::Caution => &self.palette.caution,
            Tier::Warning => &self.palette.warning,
            Tier::Critical => &self.palette.critical,
        }
    }

    /// Color for a usage ratio.
    pub fn ratio_color(&self, ratio: f64) -> &str {
        self.tier_color(self.tier(ratio))
    }
}
