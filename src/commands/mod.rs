//! Command implementations behind the CLI subcommands.

mod check;
pub mod config;
mod list;

pub use check::{DEFAULT_OUTPUT, check, check_all};
pub use list::list;
