//! Command models

pub mod command;

pub use command::{Command, PatchCommand, PromoteCommand, ReleaseCommand, RollbackCommand};
