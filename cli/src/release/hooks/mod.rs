//! Built-in release hooks, in the order they run

pub mod core_release;
pub mod signing;

pub use core_release::CoreReleaseHook;
pub use signing::SigningHook;
