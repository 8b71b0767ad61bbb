//! CLI commands module.

mod config;
mod extract;
mod inspect;
mod tracks;
mod util;

pub use extract::ExtractCommand;
pub use inspect::InspectCommand;
pub use tracks::TracksCommand;

pub(crate) use config::*;
pub(crate) use util::*;
