use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Local, Utc};

use crate::config::{ConfigStore, DisplaySet, FileStore, Plan, Preferences};
use crate::render::{self, Context, Menu, Theme};
use crate::usage::{CommandAnalyzer, UsageAnalyzer};

/// Entry point for the render path. Wraps `run_inner` in `catch_unwind`
/// so the host always gets a menu and the process always exits 0.
pub fn run() -> Result<()> {
    let result = std::panic::catch_unwind(run_inner);

    let message = match result {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(e)) => {
            tracing::error!("render failed: {:#}", e);
            e.to_string()
        }
        Err(_) => "unexpected panic while rendering".to_string(),
    };

    let menu = render::error("Internal error", &message, &fallback_context(&Theme::default()));
    let _ = write_menu(&menu);
    Ok(())
}

fn run_inner() -> Result<()> {
    let now = Utc::now();
    let theme = Theme::default();
    let prefs = Preferences::from_env(FileStore::from_env());
    let analyzer = CommandAnalyzer::from_env(now);
    tracing::debug!("analyzer: {}", analyzer.program());

    let menu = build(&prefs, &analyzer, &theme, now, local_offset(), self_path());
    write_menu(&menu)
}

/// Load preferences, fetch once, render.
pub fn build<S: ConfigStore, A: UsageAnalyzer>(
    prefs: &Preferences<S>,
    analyzer: &A,
    theme: &Theme,
    now: DateTime<Utc>,
    offset: FixedOffset,
    self_path: String,
) -> Menu {
    let plan = prefs.get_plan();
    let display = prefs.get_display();

    let result = analyzer.fetch(plan, now);
    if let Err(e) = &result {
        tracing::warn!("fetching usage failed: {}", e);
    }

    let ctx = Context {
        theme,
        plan,
        display,
        now,
        offset,
        self_path,
        monitor: analyzer.live_command(),
    };
    render::render(&result, &ctx)
}

fn write_menu(menu: &Menu) -> Result<()> {
    let mut out = std::io::stdout().lock();
    write!(out, "{}", menu)?;
    out.flush()?;
    Ok(())
}

fn fallback_context(theme: &Theme) -> Context<'_> {
    Context {
        theme,
        plan: Plan::default(),
        display: DisplaySet::default(),
        now: Utc::now(),
        offset: local_offset(),
        self_path: self_path(),
        monitor: None,
    }
}

fn local_offset() -> FixedOffset {
    *Local::now().offset()
}

/// Absolute path of this binary, for submenu items to call back into.
fn self_path() -> String {
    std::env::current_exe()
        .and_then(|p| p.canonicalize())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "ccm-bar".to_string())
}
