use super::report::{decide_exit, diagnostics_json, fatal, print_text};
use super::settings::Settings;
use crate::cli::args::{OutputFormat, ValidateArgs};
use baseline_core::Diagnostic;

pub fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let settings = match Settings::from_args(&args.source, true) {
        Ok(s) => s,
        Err(e) => {
            let diag = Diagnostic::new(e.code(), args.source.config.display().to_string(), e.to_string());
            return fatal(&args.profile, diag, args.format);
        }
    };

    let plan = match settings.resolver().and_then(|r| r.resolve(&args.profile)) {
        Ok(plan) => plan,
        Err(e) => return fatal(&args.profile, e.to_diagnostic(), args.format),
    };

    let exit_code = decide_exit(&plan, args.deny_warnings || settings.deny_warnings);

    match args.format {
        // Text format is always printed to stderr (human-readable)
        OutputFormat::Text => print_text(&args.profile, &plan.diagnostics),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&diagnostics_json(
                &args.profile,
                &plan.diagnostics,
                exit_code
            ))?
        ),
    }

    Ok(exit_code)
}
