/// Contains the helm client, which executes helm commands.
pub mod client;

/// Contains the builder for the helm argument vectors of a chart entry.
pub mod command;
