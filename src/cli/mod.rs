mod config;
pub use self::config::Config;

mod start;
pub use self::start::{Invocation, build, get_config_path, start};

pub mod commands;
