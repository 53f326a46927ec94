//! One module per subcommand.  Each exposes an `execute` function.

pub mod activate;
pub mod add;
pub mod get;
pub mod init;
pub mod label;
pub mod list;
pub mod next;
pub mod remove;
pub mod update;
