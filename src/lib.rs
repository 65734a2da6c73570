//! repodesk: backend for a browser IDE over locally cloned GitHub repositories

pub mod completion;
pub mod config;
pub mod filesystem;
pub mod github;
pub mod protocol;
pub mod server;
pub mod session;
