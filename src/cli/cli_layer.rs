// Command-line surface: argument parsing and reading the notes.

#[path = "args.rs"]
pub mod args;

#[path = "input.rs"]
pub mod input;

pub use args::{AuthConfig, Cli};
pub use input::read_notes;
