//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod check;
pub mod config_cmd;
pub mod set;
pub mod status;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a portal-bound command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        // These manage their own controller lifecycle.
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Check => check::handle(global).await,

        cmd => {
            let (controller, _profile) = util::connect(global).await?;
            let result = match cmd {
                Command::Status(args) => status::handle(&controller, args, global).await,
                Command::Set(args) => set::handle(&controller, args, global).await,
                Command::On(args) => set::turn_on(&controller, args, global).await,
                Command::Off(args) => set::turn_off(&controller, args, global).await,
                // Config and Completions are handled before dispatch
                Command::Watch(_) | Command::Check | Command::Config(_) | Command::Completions(_) => {
                    unreachable!()
                }
            };
            controller.shutdown().await;
            result
        }
    }
}
