use super::report::fatal;
use super::settings::Settings;
use crate::cli::args::{OutputFormat, ProfilesArgs};
use crate::exit_codes;
use baseline_core::{Diagnostic, ProfileArena, ResolveError};
use serde_json::json;

pub fn run(args: ProfilesArgs) -> anyhow::Result<i32> {
    let settings = match Settings::from_args(&args.source, false) {
        Ok(s) => s,
        Err(e) => {
            let diag = Diagnostic::new(e.code(), args.source.config.display().to_string(), e.to_string());
            return fatal("profiles", diag, args.format);
        }
    };

    let arena = match ProfileArena::load_dir(&settings.profiles_dir) {
        Ok(arena) => arena,
        Err(e) => return fatal("profiles", ResolveError::from(e).to_diagnostic(), args.format),
    };

    match args.format {
        OutputFormat::Text => {
            for p in arena.profiles() {
                println!(
                    "{:<24} extends={:<16} documentation_complete={}  {}",
                    p.id,
                    p.extends.as_deref().unwrap_or("-"),
                    p.documentation_complete,
                    p.title
                );
            }
        }
        OutputFormat::Json => {
            let rows: Vec<_> = arena
                .profiles()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "title": p.title,
                        "extends": p.extends,
                        "documentation_complete": p.documentation_complete,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(exit_codes::SUCCESS)
}
