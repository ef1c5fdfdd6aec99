//! CLI command implementations

pub mod access;
pub mod create;
pub mod dispute;
pub mod doctor;
pub mod group;
pub mod history;
pub mod init;
pub mod ledger;
pub mod list;
pub mod show;
pub mod transition;
pub mod tree;
