/// The clap definition of the command structure.
pub mod def;

/// Log output formatting.
pub mod log;

/// Printing helpers and CLI styling.
pub mod printing;

/// Processing of parsed commands.
pub mod process;
