//! `--set-plan` / `--toggle-display`, invoked from the menu's submenus.
//!
//! Unknown ids are ignored and the process still exits 0; the host only
//! re-renders on its next tick either way.

use anyhow::Result;

use super::Cli;
use crate::config::{ConfigStore, FileStore, Preferences};

pub fn run(cli: &Cli) -> Result<()> {
    let store = FileStore::from_env();
    match &store {
        Some(s) => tracing::debug!("config file: {}", s.path().display()),
        None => tracing::warn!("no home directory; config changes will not persist"),
    }
    apply(cli, &Preferences::from_env(store));
    Ok(())
}

/// Apply the mutation flags in order: plan first, then the display toggle.
pub fn apply<S: ConfigStore>(cli: &Cli, prefs: &Preferences<S>) {
    if let Some(plan) = &cli.set_plan {
        if prefs.set_plan(plan) {
            tracing::info!("plan set to {}", plan.trim().to_ascii_lowercase());
        }
    }
    if let Some(metric) = &cli.toggle_display {
        if prefs.toggle_display(metric) {
            tracing::info!("toggled {}", metric.trim().to_ascii_lowercase());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemoryStore, Metric, Plan, WidgetConfig};

    fn cli(plan: Option<&str>, toggle: Option<&str>) -> Cli {
        Cli {
            set_plan: plan.map(String::from),
            toggle_display: toggle.map(String::from),
        }
    }

    #[test]
    fn test_apply_sets_plan() {
        let prefs = Preferences::new(MemoryStore::default(), None);
        apply(&cli(Some("MAX20"), None), &prefs);
        assert_eq!(prefs.get_plan(), Plan::Max20);
    }

    #[test]
    fn test_apply_invalid_plan_keeps_existing() {
        let stored = WidgetConfig {
            plan: Some("max5".into()),
            display: None,
        };
        let prefs = Preferences::new(MemoryStore::with(stored), None);
        apply(&cli(Some("platinum"), None), &prefs);
        assert_eq!(prefs.get_plan(), Plan::Max5);
        assert_eq!(prefs.store().saves.get(), 0);
    }

    #[test]
    fn test_apply_both_flags() {
        let prefs = Preferences::new(MemoryStore::default(), None);
        apply(&cli(Some("custom"), Some("msg_pct")), &prefs);
        assert_eq!(prefs.get_plan(), Plan::Custom);
        assert!(prefs.get_display().is_enabled(Metric::MsgPct));
    }

    #[test]
    fn test_apply_toggle_twice_restores() {
        let prefs = Preferences::new(MemoryStore::default(), None);
        let before = prefs.get_display();
        apply(&cli(None, Some("cost")), &prefs);
        apply(&cli(None, Some("cost")), &prefs);
        assert_eq!(prefs.get_display(), before);
    }
}
