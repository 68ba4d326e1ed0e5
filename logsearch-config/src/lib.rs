pub mod setting;
pub mod config;
pub mod dbconfig;
pub mod duration;

pub use setting::Settings;
pub use config::SearchConfig;
pub use dbconfig::{DbConfig, TableNames};
pub use duration::parse_duration;
