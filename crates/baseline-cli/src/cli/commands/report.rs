use crate::cli::args::OutputFormat;
use crate::exit_codes;
use baseline_core::{BuildPlan, Diagnostic, Diagnostics, Severity};
use serde_json::json;

pub(crate) fn decide_exit(plan: &BuildPlan, deny_warnings: bool) -> i32 {
    let threshold = if deny_warnings {
        Severity::Warning
    } else {
        Severity::Error
    };
    if plan.diagnostics.has_at_or_above(threshold) {
        exit_codes::DIAGNOSTICS_FAILED
    } else {
        exit_codes::SUCCESS
    }
}

/// JSON body shared by `validate --format json` and fatal errors.
pub(crate) fn diagnostics_json(
    profile: &str,
    diagnostics: &Diagnostics,
    exit_code: i32,
) -> serde_json::Value {
    json!({
        "profile": profile,
        "exit_code": exit_code,
        "errors": diagnostics.errors(),
        "warnings": diagnostics.warnings(),
        "diagnostics": diagnostics,
    })
}

/// Human-readable diagnostics, always on stderr.
pub(crate) fn print_text(profile: &str, diagnostics: &Diagnostics) {
    for d in diagnostics {
        eprintln!("{}", d.format_terminal());
    }

    let errors = diagnostics.errors();
    let warnings = diagnostics.warnings();
    if errors > 0 {
        eprintln!(
            "✖ {} failed ({} error{}, {} warning{})",
            profile,
            errors,
            if errors != 1 { "s" } else { "" },
            warnings,
            if warnings != 1 { "s" } else { "" }
        );
    } else if warnings > 0 {
        eprintln!(
            "⚠️  {} resolved with warnings ({} warning{})",
            profile,
            warnings,
            if warnings != 1 { "s" } else { "" }
        );
    } else {
        eprintln!("✔ {} OK", profile);
    }
}

/// Report a fatal error and return its exit code.
pub(crate) fn fatal(profile: &str, diagnostic: Diagnostic, format: OutputFormat) -> anyhow::Result<i32> {
    let exit_code = exit_codes::CONFIG_ERROR;
    let diagnostics = Diagnostics::from(vec![diagnostic]);
    match format {
        OutputFormat::Text => print_text(profile, &diagnostics),
        OutputFormat::Json => eprintln!(
            "{}",
            serde_json::to_string_pretty(&diagnostics_json(profile, &diagnostics, exit_code))?
        ),
    }
    Ok(exit_code)
}
