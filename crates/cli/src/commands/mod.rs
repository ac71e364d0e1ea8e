//! CLI Commands

pub mod run;
pub mod list;
pub mod serve;
