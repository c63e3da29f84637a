pub mod apply;
pub mod classify;
pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod host;
pub mod merge;
pub mod output;
pub mod plan;
pub mod resolve;
