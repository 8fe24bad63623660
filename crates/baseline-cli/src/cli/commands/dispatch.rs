use super::*;
use crate::exit_codes::SUCCESS;

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Resolve(args) => super::resolve::run(args),
        Command::Validate(args) => super::validate::run(args),
        Command::Profiles(args) => super::profiles::run(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
