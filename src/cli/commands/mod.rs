//! Task implementations behind the CLI subcommands.

mod package;
mod publish;

pub use package::package;
pub use publish::publish;
