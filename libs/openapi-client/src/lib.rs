//! Wire models for the AppSync management API

pub mod models;

pub use models::{ErrorResponse, Package, PackageInfo, PackageInfoRequest, PackageResponse};
