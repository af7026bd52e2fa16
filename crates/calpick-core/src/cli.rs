use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow!("empty option name in: {s}"));
        }
        Ok(Self {
            key: key.to_string(),
            value: value.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "calpick",
    version,
    about = "calpick: a headless date picker calendar",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Override one picker option, e.g. `--rc first_day=1`.
    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// Options file to use instead of the default lookup.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the calendar markup.
    Render(ViewArgs),
    /// Print the visible months as a text grid.
    Grid(GridArgs),
    /// Print the visible months as JSON.
    Json(ViewArgs),
    /// Drive a bound picker from a line-oriented script.
    Session(SessionArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Pretend today is this date.
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Month to show.
    #[arg(long = "goto")]
    pub goto: Option<NaiveDate>,

    /// Date to select.
    #[arg(long)]
    pub select: Option<NaiveDate>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GridArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    #[arg(long = "no-color")]
    pub no_color: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Script to run; reads stdin when omitted or `-`.
    pub script: Option<PathBuf>,

    /// Pretend today is this date.
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Initial text of the bound field.
    #[arg(long, default_value = "")]
    pub field: String,

    /// Give the field a separate trigger element.
    #[arg(long)]
    pub trigger: bool,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) => "warn",
        (0, 3..) => "trace",
        (0, 2) => "debug",
        (0, 1) => "info",
        _ => "warn",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` (or `rc.key:value`) tokens out of the
/// argument list so clap never sees them.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest.split_once('=').or_else(|| rest.split_once(':'));
            if let Some((k, v)) = parsed {
                if k.trim().is_empty() {
                    return Err(anyhow!("empty option name in: {s}"));
                }
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((format!("rc.{k}"), v.to_string()));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_overrides_are_captured() {
        let pre = preprocess_args(&args(&[
            "calpick",
            "rc.first_day=1",
            "grid",
            "rc.i18n.today:Now",
        ]))
        .expect("preprocess");
        assert_eq!(pre.cleaned_args, args(&["calpick", "grid"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.first_day".to_string(), "1".to_string()),
                ("rc.i18n.today".to_string(), "Now".to_string()),
            ]
        );
    }

    #[test]
    fn key_val_requires_a_key() {
        assert!("=1".parse::<KeyVal>().is_err());
        assert!("first_day".parse::<KeyVal>().is_err());
        let kv: KeyVal = " is_rtl = true ".parse().expect("keyval");
        assert_eq!(kv.key, "is_rtl");
        assert_eq!(kv.value, "true");
    }

    #[test]
    fn subcommands_parse_dates() {
        let cli = GlobalCli::parse_from(args(&[
            "calpick",
            "grid",
            "--today",
            "2024-02-10",
            "--select",
            "2024-02-14",
            "--no-color",
            "--rc",
            "number_of_months=2",
        ]));
        let Command::Grid(grid) = cli.command else {
            panic!("expected grid");
        };
        assert!(grid.no_color);
        assert_eq!(grid.view.today, NaiveDate::from_ymd_opt(2024, 2, 10));
        assert_eq!(grid.view.select, NaiveDate::from_ymd_opt(2024, 2, 14));
        assert_eq!(cli.rc_overrides.len(), 1);
    }
}
