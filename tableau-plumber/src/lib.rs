pub mod cli;
pub mod hyper;
pub mod load_config;
pub mod rest;

pub use cli::{run, Cli, Commands};
