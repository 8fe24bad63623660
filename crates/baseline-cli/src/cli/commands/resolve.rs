use super::report::{decide_exit, diagnostics_json, fatal, print_text};
use super::settings::Settings;
use crate::cli::args::{OutputFormat, ResolveArgs};
use baseline_core::Diagnostic;

pub fn run(args: ResolveArgs) -> anyhow::Result<i32> {
    // 1. Settings
    let settings = match Settings::from_args(&args.source, true) {
        Ok(s) => s,
        Err(e) => {
            let diag = Diagnostic::new(e.code(), args.source.config.display().to_string(), e.to_string());
            return fatal(&args.profile, diag, args.format);
        }
    };

    // 2. Load + resolve
    let plan = match settings.resolver().and_then(|r| r.resolve(&args.profile)) {
        Ok(plan) => plan,
        Err(e) => return fatal(&args.profile, e.to_diagnostic(), args.format),
    };

    // 3. Exit code
    let exit_code = decide_exit(&plan, args.deny_warnings || settings.deny_warnings);

    // 4. Plan to stdout or file, diagnostics to stderr
    let body = plan.to_json_pretty()?;
    match args.output.as_ref().or(settings.output.as_ref()) {
        Some(path) => {
            std::fs::write(path, format!("{}\n", body))
                .map_err(|e| anyhow::anyhow!("failed to write {}: {}", path.display(), e))?;
            eprintln!("Build plan written to {}", path.display());
        }
        None => println!("{}", body),
    }

    match args.format {
        OutputFormat::Text => print_text(&args.profile, &plan.diagnostics),
        OutputFormat::Json => eprintln!(
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
