mod bootstrap;
mod repl;
mod session;

pub(crate) use bootstrap::build_app;
pub(crate) use repl::{parse_command, Command};
