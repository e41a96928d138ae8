mod args;

pub use args::{CliArgs, Command, CompressionLevel, FilterArg, InspectArgs, PackArgs};
