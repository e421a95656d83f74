pub mod config;
pub mod discover;
pub mod generate;

// Re-export handler functions for convenience
pub use config::handle_config_command;
pub use discover::handle_discover_command;
pub use generate::handle_generate_command;
