//! Local state: connection file and its layout

pub mod layout;
pub mod settings;
