//! SwiftBar/xbar menu rendering.
//!
//! The host reads stdout line by line: the first line is the menu bar
//! title, `---` separates sections, `text | key=value ...` attaches style
//! and actions, and a leading `--` nests an item one submenu level down.

pub mod format;
pub mod theme;

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, Utc};

pub use theme::Theme;

use crate::config::{DisplaySet, Metric, Plan};
use crate::error::FetchError;
use crate::usage::{ratio, LastSession, Snapshot, Usage};
use format::{
    bar_graph, clip, format_clock, format_cost, format_minutes, format_number, format_percent,
    format_ratio_whole, truncate_label,
};

/// Longest analyzer error shown in the dropdown.
const MAX_ERROR_LEN: usize = 80;

/// Limit notices shown before the rest are dropped.
const MAX_LIMIT_NOTICES: usize = 3;

/// Projections further out than this are shown as this.
const MAX_ETA_MINUTES: f64 = 1.0e6;

/// Host attribute names for action arguments.
const PARAMS: [&str; 9] = [
    "param1", "param2", "param3", "param4", "param5", "param6", "param7", "param8", "param9",
];

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// One menu row.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    depth: usize,
    text: String,
    attrs: Vec<(&'static str, String)>,
}

impl Line {
    /// Newlines and `|` would break the protocol, so they are replaced.
    pub fn new(text: impl AsRef<str>) -> Self {
        let text = text
            .as_ref()
            .chars()
            .map(|c| match c {
                '\n' | '\r' => ' ',
                '|' => '/',
                c => c,
            })
            .collect();
        Self {
            depth: 0,
            text,
            attrs: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &'static str, value: impl ToString) -> Self {
        self.attrs.push((key, value.to_string()));
        self
    }

    /// Nest one submenu level deeper.
    pub fn nested(mut self) -> Self {
        self.depth += 1;
        self
    }

    #[cfg(test)]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn quote(value: &str) -> String {
    if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str("--")?;
        }
        f.write_str(&self.text)?;
        if !self.attrs.is_empty() {
            f.write_str(" |")?;
            for (key, value) in &self.attrs {
                write!(f, " {}={}", key, quote(value))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Separator,
    Row(Line),
}

/// A complete render: title line plus dropdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct Menu {
    pub title: Line,
    pub body: Vec<Item>,
}

impl Menu {
    fn new(title: Line) -> Self {
        Self {
            title,
            body: Vec::new(),
        }
    }

    fn push(&mut self, line: Line) {
        self.body.push(Item::Row(line));
    }

    /// Add a separator unless the body is empty or already ends in one.
    fn separator(&mut self) {
        if matches!(self.body.last(), Some(Item::Row(_))) {
            self.body.push(Item::Separator);
        }
    }

    #[cfg(test)]
    pub fn rows(&self) -> impl Iterator<Item = &Line> {
        self.body.iter().filter_map(|item| match item {
            Item::Row(line) => Some(line),
            Item::Separator => None,
        })
    }
}

impl fmt::Display for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "---")?;
        for item in &self.body {
            match item {
                Item::Separator => writeln!(f, "---")?,
                Item::Row(line) => writeln!(f, "{}", line)?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Inputs to one render besides the usage itself.
pub struct Context<'a> {
    pub theme: &'a Theme,
    pub plan: Plan,
    pub display: DisplaySet,
    pub now: DateTime<Utc>,
    /// Offset wall-clock times are shown in.
    pub offset: FixedOffset,
    /// Path submenu actions re-invoke.
    pub self_path: String,
    /// Live view the footer opens in a terminal; no footer link without one.
    pub monitor: Option<Vec<String>>,
}

impl Context<'_> {
    fn title(&self, text: impl AsRef<str>, color: &str) -> Line {
        let theme = self.theme;
        Line::new(text)
            .attr("color", color)
            .attr("font", &theme.title_font)
            .attr("size", theme.title_size)
            .attr("offset", theme.title_offset)
    }

    fn heading(&self, text: impl AsRef<str>) -> Line {
        self.body(text, &self.theme.palette.text)
    }

    fn body(&self, text: impl AsRef<str>, color: &str) -> Line {
        Line::new(text)
            .attr("color", color)
            .attr("font", &self.theme.body_font)
            .attr("size", self.theme.body_size)
    }

    fn small(&self, text: impl AsRef<str>, color: &str) -> Line {
        Line::new(text)
            .attr("color", color)
            .attr("font", &self.theme.body_font)
            .attr("size", self.theme.small_size)
    }

    fn plain(&self, text: impl AsRef<str>) -> Line {
        Line::new(text)
            .attr("font", &self.theme.body_font)
            .attr("size", self.theme.body_size)
    }

    /// Submenu item that re-invokes this binary with `flag value`.
    fn action(&self, text: impl AsRef<str>, flag: &str, value: &str) -> Line {
        Line::new(text)
            .nested()
            .attr("font", &self.theme.body_font)
            .attr("size", self.theme.small_size)
            .attr("bash", &self.self_path)
            .attr("param1", flag)
            .attr("param2", value)
            .attr("terminal", false)
            .attr("refresh", true)
    }

    fn clock(&self, time: DateTime<Utc>) -> String {
        format_clock(time, self.offset)
    }
}

fn check(on: bool) -> &'static str {
    if on {
        "\u{2713} "
    } else {
        "   "
    }
}

// ---------------------------------------------------------------------------
// Menus
// ---------------------------------------------------------------------------

/// Render whatever the analyzer returned.
pub fn render(result: &Result<Usage, FetchError>, ctx: &Context<'_>) -> Menu {
    match result {
        Ok(Usage::Active(snapshot)) => active(snapshot, ctx),
        Ok(Usage::Idle(last)) => idle(last.as_ref(), ctx),
        Err(FetchError::NotInstalled(program)) => not_installed(program, ctx),
        Err(e) => error("Error loading data", &e.to_string(), ctx),
    }
}

/// Compact title from the enabled metrics, or `CCM` when none apply.
pub fn title_text(snapshot: &Snapshot, display: &DisplaySet) -> String {
    let parts: Vec<String> = display
        .iter()
        .filter_map(|metric| match metric {
            Metric::TokenPct => Some(format!("TKN {}", format_ratio_whole(snapshot.token_ratio()))),
            Metric::Cost => Some(format!("CST {}", format_cost(snapshot.cost))),
            Metric::CostPct => Some(format!("CST {}", format_ratio_whole(snapshot.cost_ratio()))),
            Metric::Msg => snapshot
                .messages
                .map(|m| format!("MSG {}/{}", m, snapshot.message_limit)),
            Metric::MsgPct => snapshot
                .messages
                .map(|_| format!("MSG {}", format_ratio_whole(snapshot.message_ratio()))),
        })
        .collect();

    if parts.is_empty() {
        "CCM".to_string()
    } else {
        parts.join("  ")
    }
}

/// Menu for an open session.
pub fn active(snapshot: &Snapshot, ctx: &Context<'_>) -> Menu {
    let theme = ctx.theme;
    let title_color = theme.ratio_color(snapshot.peak_ratio());
    let mut menu = Menu::new(ctx.title(title_text(snapshot, &ctx.display), title_color));

    plan_submenu(&mut menu, ctx);
    display_submenu(&mut menu, ctx);
    menu.separator();

    usage_section(
        &mut menu,
        ctx,
        "Tokens",
        (snapshot.tokens as f64, snapshot.token_limit as f64),
        format!(
            "{} / {}",
            format_number(snapshot.tokens),
            format_number(snapshot.token_limit)
        ),
    );
    usage_section(
        &mut menu,
        ctx,
        "Cost",
        (snapshot.cost, snapshot.cost_limit),
        format!(
            "{} / {}",
            format_cost(snapshot.cost),
            format_cost(snapshot.cost_limit)
        ),
    );
    if let Some(messages) = snapshot.messages {
        usage_section(
            &mut menu,
            ctx,
            "Messages",
            (messages as f64, snapshot.message_limit as f64),
            format!(
                "{} / {}",
                format_number(messages),
                format_number(snapshot.message_limit)
            ),
        );
    }
    menu.push(ctx.heading("Duration"));
    menu.push(ctx.small(
        format!("  {}", format_minutes(snapshot.elapsed_minutes)),
        &theme.palette.dim,
    ));

    projection_section(&mut menu, snapshot, ctx);
    models_section(&mut menu, snapshot, ctx);
    limits_section(&mut menu, snapshot, ctx);

    menu.separator();
    footer(&mut menu, ctx);
    menu
}

fn plan_submenu(menu: &mut Menu, ctx: &Context<'_>) {
    menu.push(ctx.heading(format!("Plan: {}", ctx.plan.label())));
    for plan in Plan::ALL {
        menu.push(ctx.action(
            format!("{}{}", check(plan == ctx.plan), plan.label()),
            "--set-plan",
            plan.id(),
        ));
    }
}

fn display_submenu(menu: &mut Menu, ctx: &Context<'_>) {
    menu.push(ctx.heading("Display"));
    for metric in Metric::ALL {
        menu.push(ctx.action(
            format!("{}{}", check(ctx.display.is_enabled(metric)), metric.label()),
            "--toggle-display",
            metric.key(),
        ));
    }
}

/// Heading, bar with percentage, then `used / limit`.
fn usage_section(
    menu: &mut Menu,
    ctx: &Context<'_>,
    heading: &str,
    (used, limit): (f64, f64),
    amounts: String,
) {
    let theme = ctx.theme;
    let r = ratio(used, limit);
    menu.push(ctx.heading(heading));
    menu.push(ctx.small(
        format!("  {}  {}", bar_graph(r, theme.bar_width), format_percent(used, limit)),
        theme.ratio_color(r),
    ));
    menu.push(ctx.small(format!("  {}", amounts), &theme.palette.dim));
}

fn projection_section(menu: &mut Menu, snapshot: &Snapshot, ctx: &Context<'_>) {
    let label = &ctx.theme.palette.label;
    let mut rows = Vec::new();

    if let Some(burn) = snapshot.burn_rate {
        rows.push(ctx.small(
            format!(
                "Burn  {:.0} tok/min  {}/min",
                burn.tokens_per_minute,
                format_cost(burn.cost_per_hour / 60.0)
            ),
            label,
        ));
    }

    if let Some(remaining) = snapshot.remaining_minutes {
        let minutes = remaining.min(MAX_ETA_MINUTES);
        let exhausted_at = ctx.now + Duration::seconds((minutes * 60.0) as i64);
        rows.push(ctx.small(
            format!(
                "ETA   {} left \u{2192} {}",
                format_minutes(remaining),
                ctx.clock(exhausted_at)
            ),
            label,
        ));
    }

    if let Some(reset) = snapshot.resets_at {
        rows.push(ctx.small(format!("Reset {}", ctx.clock(reset)), label));
    }

    if !rows.is_empty() {
        menu.separator();
        for row in rows {
            menu.push(row);
        }
    }
}

fn models_section(menu: &mut Menu, snapshot: &Snapshot, ctx: &Context<'_>) {
    if snapshot.models.is_empty() || snapshot.tokens == 0 {
        return;
    }
    let theme = ctx.theme;
    menu.separator();
    menu.push(ctx.heading("Models"));
    for model in &snapshot.models {
        let share = ratio(model.tokens as f64, snapshot.tokens as f64);
        let color = if share > 0.5 {
            theme.ratio_color(share)
        } else {
            theme.palette.dim.as_str()
        };
        let name = truncate_label(&model.name, theme.model_name_width);
        menu.push(ctx.small(
            format!(
                "  {:<width$} {:>4}",
                name,
                format_ratio_whole(share),
                width = theme.model_name_width + 2
            ),
            color,
        ));
    }
}

fn limits_section(menu: &mut Menu, snapshot: &Snapshot, ctx: &Context<'_>) {
    if snapshot.limit_notices.is_empty() {
        return;
    }
    let critical = &ctx.theme.palette.critical;
    menu.separator();
    menu.push(ctx.body("\u{26A0} Limit Reached", critical));
    for notice in snapshot.limit_notices.iter().take(MAX_LIMIT_NOTICES) {
        let text = match notice.resets_at {
            Some(reset) => format!("  {} \u{2192} resets {}", notice.kind, ctx.clock(reset)),
            None => format!("  {}", notice.kind),
        };
        menu.push(ctx.small(text, critical));
    }
}

fn footer(menu: &mut Menu, ctx: &Context<'_>) {
    if let Some((program, args)) = ctx.monitor.as_deref().and_then(<[String]>::split_first) {
        if args.len() <= PARAMS.len() {
            let mut line = ctx.plain("Open Live Monitor").attr("bash", program);
            for (key, arg) in PARAMS.iter().zip(args) {
                line = line.attr(*key, arg);
            }
            menu.push(line.attr("terminal", true));
        }
    }
    menu.push(ctx.plain("Refresh").attr("refresh", true));
}

/// Menu when no session is open.
pub fn idle(last: Option<&LastSession>, ctx: &Context<'_>) -> Menu {
    let palette = &ctx.theme.palette;
    let mut menu = Menu::new(ctx.title("CCM  Idle", &palette.muted));

    match last {
        Some(last) => {
            menu.push(ctx.heading("Last Session"));
            menu.push(ctx.small(
                format!(
                    "  TKN  {:>10}     MSG  {}",
                    format_number(last.tokens),
                    last.messages
                ),
                &palette.dim,
            ));
            menu.push(ctx.small(
                format!(
                    "  CST  {:>10}     DUR  {}",
                    format_cost(last.cost),
                    format_minutes(last.duration_minutes)
                ),
                &palette.dim,
            ));
            menu.separator();
            footer(&mut menu, ctx);
        }
        None => {
            menu.push(ctx.body("No usage data found", &palette.dim));
            menu.push(ctx.small("Start a Claude Code session to see metrics", &palette.dim));
        }
    }
    menu
}

/// Menu for a failed fetch. The title stays a fixed label.
pub fn error(headline: &str, message: &str, ctx: &Context<'_>) -> Menu {
    let palette = &ctx.theme.palette;
    let mut menu = Menu::new(ctx.title("CCM \u{2014}", &palette.muted));
    menu.push(ctx.body(headline, &palette.critical));
    menu.push(ctx.small(clip(message, MAX_ERROR_LEN), &palette.dim));
    menu
}

fn not_installed(program: &str, ctx: &Context<'_>) -> Menu {
    if program != "ccusage" {
        return error(
            &format!("{} not installed", program),
            &format!("{} was not found on PATH", program),
            ctx,
        );
    }
    let mut menu = error(
        "ccusage not installed",
        "Install: npm install -g ccusage",
        ctx,
    );
    menu.separator();
    menu.push(
        ctx.plain("Install ccusage")
            .attr("bash", "npm")
            .attr("param1", "install")
            .attr("param2", "-g")
            .attr("param3", "ccusage")
            .attr("terminal", true),
    );
    menu
}
