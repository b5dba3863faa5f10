use std::path::Path;
use std::process::{Command, Stdio};

use chrono::{DateTime, Days, Local, Utc};

use super::blocks::{classify, parse_report};
use super::{limits, Usage, UsageAnalyzer};
use crate::config::Plan;
use crate::error::FetchError;

/// Environment variable overriding the analyzer command line.
pub const ANALYZER_ENV: &str = "CCM_ANALYZER";

const DEFAULT_PROGRAM: &str = "ccusage";
const DEFAULT_ARGS: [&str; 3] = ["blocks", "--json", "--offline"];
const LIVE_ARGS: [&str; 2] = ["blocks", "--live"];

/// `ccusage`, a path ending in it, or a versioned package spec like
/// `ccusage@latest`.
fn is_ccusage(word: &str) -> bool {
    let name = Path::new(word)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(word);
    name == DEFAULT_PROGRAM || name.starts_with("ccusage@")
}

/// Runs an external analyzer that prints session blocks as JSON.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    program: String,
    args: Vec<String>,
}

impl CommandAnalyzer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `ccusage blocks --json --offline --since <yesterday>`.
    pub fn ccusage(now: DateTime<Utc>) -> Self {
        let mut args: Vec<String> = DEFAULT_ARGS.iter().map(|a| a.to_string()).collect();
        let since = now
            .with_timezone(&Local)
            .date_naive()
            .checked_sub_days(Days::new(1));
        if let Some(day) = since {
            args.push("--since".to_string());
            args.push(day.format("%Y%m%d").to_string());
        }
        Self::new(DEFAULT_PROGRAM, args)
    }

    /// Whitespace-split `CCM_ANALYZER` if set, else [`CommandAnalyzer::ccusage`].
    pub fn from_env(now: DateTime<Utc>) -> Self {
        std::env::var(ANALYZER_ENV)
            .ok()
            .and_then(|cmd| Self::parse(&cmd))
            .unwrap_or_else(|| Self::ccusage(now))
    }

    fn parse(cmd: &str) -> Option<Self> {
        let mut words = cmd.split_whitespace().map(String::from);
        let program = words.next()?;
        Some(Self::new(program, words.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self) -> Result<Vec<u8>, FetchError> {
        let path = which::which(&self.program)
            .map_err(|_| FetchError::NotInstalled(self.program.clone()))?;

        tracing::debug!("running {} {}", path.display(), self.args.join(" "));
        let output = Command::new(&path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| FetchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(String::from)
                .unwrap_or_else(|| format!("{} exited with {}", self.program, output.status));
            return Err(FetchError::Failed(message));
        }

        Ok(output.stdout)
    }
}

impl UsageAnalyzer for CommandAnalyzer {
    fn fetch(&self, plan: Plan, now: DateTime<Utc>) -> Result<Usage, FetchError> {
        let stdout = self.run()?;
        if stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(Usage::Idle(None));
        }
        let blocks = parse_report(&stdout)?;
        let limits = limits::resolve(plan, &blocks);
        Ok(classify(&blocks, limits, now))
    }

    /// `ccusage blocks --live`, launched the same way the analyzer is:
    /// directly, or through a runner such as `npx ccusage@latest`.
    fn live_command(&self) -> Option<Vec<String>> {
        let prefix = if is_ccusage(&self.program) {
            0
        } else {
            self.args.iter().position(|a| is_ccusage(a))? + 1
        };
        let mut cmd = vec![self.program.clone()];
        cmd.extend(self.args[..prefix].iter().cloned());
        cmd.extend(LIVE_ARGS.iter().map(|a| a.to_string()));
        Some(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let analyzer = CommandAnalyzer::parse("  npx ccusage@latest blocks --json ").unwrap();
        assert_eq!(analyzer.program, "npx");
        assert_eq!(analyzer.args, vec!["ccusage@latest", "blocks", "--json"]);
        assert!(CommandAnalyzer::parse("   ").is_none());
    }

    #[test]
    fn test_live_command_follows_analyzer() {
        let live = |cmd: &str| CommandAnalyzer::parse(cmd).unwrap().live_command();
        assert_eq!(
            live("ccusage blocks --json"),
            Some(vec!["ccusage".into(), "blocks".into(), "--live".into()])
        );
        assert_eq!(
            live("/opt/bin/ccusage blocks --json").unwrap()[0],
            "/opt/bin/ccusage"
        );
        assert_eq!(
            live("npx -y ccusage@latest blocks --json"),
            Some(vec![
                "npx".into(),
                "-y".into(),
                "ccusage@latest".into(),
                "blocks".into(),
                "--live".into()
            ])
        );
        assert_eq!(live("sh /tmp/fake-analyzer.sh"), None);
    }

    #[test]
    fn test_default_command_has_since_date() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let analyzer = CommandAnalyzer::ccusage(now);
        assert_eq!(analyzer.program(), "ccusage");
        assert_eq!(analyzer.args[..3], ["blocks", "--json", "--offline"]);
        assert_eq!(analyzer.args[3], "--since");
        assert_eq!(analyzer.args[4].len(), 8);
    }

    #[test]
    fn test_missing_program_is_not_installed() {
        let analyzer = CommandAnalyzer::new("ccm-bar-definitely-not-a-real-binary", vec![]);
        let err = analyzer.fetch(Plan::Pro, Utc::now()).unwrap_err();
        assert!(matches!(err, FetchError::NotInstalled(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure_with_stderr() {
        let analyzer = CommandAnalyzer::new(
            "sh",
            vec!["-c".into(), "echo 'no log directory' >&2; exit 3".into()],
        );
        match analyzer.fetch(Plan::Pro, Utc::now()) {
            Err(FetchError::Failed(msg)) => assert_eq!(msg, "no log directory"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_garbage_output_is_parse_error() {
        let analyzer = CommandAnalyzer::new("sh", vec!["-c".into(), "echo nope".into()]);
        assert!(matches!(
            analyzer.fetch(Plan::Pro, Utc::now()),
            Err(FetchError::Parse(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_output_is_idle() {
        let analyzer = CommandAnalyzer::new("sh", vec!["-c".into(), "true".into()]);
        assert!(matches!(
            analyzer.fetch(Plan::Pro, Utc::now()),
            Ok(Usage::Idle(None))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_active_block_from_command() {
        let analyzer = CommandAnalyzer::new(
            "sh",
            vec![
                "-c".into(),
                r#"echo '{"blocks":[{"isActive":true,"totalTokens":13248,"costUSD":3.45}]}'"#
                    .into(),
            ],
        );
        match analyzer.fetch(Plan::Pro, Utc::now()) {
            Ok(Usage::Active(snap)) => {
                assert_eq!(snap.tokens, 13248);
                assert_eq!(snap.token_limit, 19_000);
            }
            other => panic!("expected active usage, got {:?}", other),
        }
    }
}
