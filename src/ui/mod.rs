pub mod commands;
pub mod render;

pub use commands::{Command, RefreshTarget, HELP};
pub use render::{notice, NoticeKind};
