pub mod command_log;
pub mod components;
pub mod error;
pub mod generate;
pub mod world;
