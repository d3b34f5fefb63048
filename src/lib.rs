pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod scanner;
pub mod storage;

pub use geopic_common as common;
