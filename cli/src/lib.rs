//! AppSync release client library
//!
//! Packages an app update (directory or single bundle file), optionally
//! signs it, and uploads it to the AppSync management service.

pub mod authn;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod package;
pub mod release;
pub mod storage;
pub mod utils;
