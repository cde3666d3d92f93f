pub(crate) mod bootstrap;
pub(crate) mod cli_args;
pub(crate) mod runner;
mod script_stubs;
