//! Authentication

pub mod session;

pub use session::SessionGuard;
