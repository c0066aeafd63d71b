//! Command handlers for the xp3 CLI

pub mod create;
pub mod extract;
pub mod list;
