//! Command-line interface for the `testimonials` binary.

use clap::{Parser, Subcommand};

/// Testimonials server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Apply database migrations and exit.
    Migrate,

    /// Create a user account.
    CreateUser {
        /// Login name.
        #[arg(long)]
        name: String,

        /// Email address.
        #[arg(long)]
        email: String,

        /// Password.
        #[arg(long, env = "TESTIMONIALS_USER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Grant the moderation capability.
        #[arg(long, default_value_t = false)]
        admin: bool,
    },
}

impl Cli {
    /// The subcommand to run, defaulting to [`Command::Serve`].
    pub fn command(self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}
