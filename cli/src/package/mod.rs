//! Packaging: manifests, zip archives, content hashes and signatures

pub mod archive;
pub mod claims;
pub mod hash;
pub mod manifest;
