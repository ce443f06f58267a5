//! Fashion Finder
//!
//! 服装写真をGeminiで解析し、Google検索付きで類似アイテムを探すCLI

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod input;
pub mod interactive;
pub mod logging;
pub mod render;
pub mod runner;
