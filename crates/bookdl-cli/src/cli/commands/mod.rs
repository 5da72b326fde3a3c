//! CLI command handlers, one file per command.

mod add;
mod pause;
mod remove;
mod resume;
mod run;
mod status;

pub use add::{parse_header, run_add};
pub use pause::run_pause;
pub use remove::run_remove;
pub use resume::run_resume;
pub use run::run_queue;
pub use status::run_status;
