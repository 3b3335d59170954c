use std::path::PathBuf;

use {
    anyhow::{Result, bail},
    chanstat_collector::schedule::CollectionSchedule,
    chanstat_config::{
        ChanstatConfig, Diagnostic, ValidationResult,
        template::default_config_template,
        validate::{self, Severity},
    },
    tracing::error,
};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn print_diagnostics(result: &ValidationResult, verbose: bool) -> usize {
    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }
    shown
}

/// Config-level checks plus whether the schedule actually parses.
fn validate_all(config: &ChanstatConfig) -> ValidationResult {
    let mut result = validate::validate(config);
    let collector = &config.collector;
    // Empty expressions and zero intervals are already reported by `validate`.
    match collector.every_secs {
        Some(0) => return result,
        None if collector.schedule.trim().is_empty() => return result,
        _ => {},
    }
    if let Err(e) = CollectionSchedule::from_config(collector) {
        let path = match e {
            chanstat_collector::Error::UnknownTimezone { .. } => "collector.timezone",
            _ => "collector.schedule",
        };
        result.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "schedule",
            path: path.into(),
            message: e.to_string(),
        });
    }
    result
}

/// `chanstat validate`: print diagnostics, exit non-zero on errors.
pub fn check(config: &ChanstatConfig, verbose: bool) -> Result<()> {
    let result = validate_all(config);
    let shown = print_diagnostics(&result, verbose);

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Refuse to start on configuration errors; warnings are logged by the
/// components they concern.
pub fn ensure_valid(config: &ChanstatConfig) -> Result<()> {
    let result = validate_all(config);
    if !result.has_errors() {
        return Ok(());
    }
    for d in result
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
    {
        error!(category = d.category, path = %d.path, "{}", d.message);
    }
    bail!(
        "configuration has {} error(s); run `chanstat validate` for details",
        result.count(Severity::Error)
    )
}

/// `chanstat init`: write the documented default config.
pub fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(chanstat_config::find_or_default_config_path);
    write_template(&path, force)?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

fn write_template(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, default_config_template())?;
    Ok(())
}
