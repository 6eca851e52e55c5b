//! CLI argument definitions for the Rack client.

use clap::{Args, Parser, Subcommand};

/// Command-line interface for managing a rack.
#[derive(Parser, Debug)]
#[command(name = "rack", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// The resource family to operate on.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Top-level command groups.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Manages attached resources such as log drains.
    Resources(ResourcesArgs),
}

/// Arguments for `rack resources`.
#[derive(Args, Debug, Clone)]
pub(crate) struct ResourcesArgs {
    /// Action to perform; lists resources when omitted.
    #[command(subcommand)]
    pub(crate) action: Option<ResourcesAction>,
}

/// Actions available under `rack resources`.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum ResourcesAction {
    /// Shows a single resource.
    Info {
        /// Resource name.
        name: String,
    },
    /// Creates a resource of the given type.
    Create {
        /// Resource type, for example `syslog`.
        #[arg(value_name = "TYPE")]
        kind: String,
        /// Resource options as `--key=value` pairs; `--name` names the resource.
        #[arg(
            value_name = "OPTION",
            num_args = 0..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        options: Vec<String>,
    },
    /// Updates parameters of an existing resource.
    Update {
        /// Resource name.
        name: String,
        /// Changed options as `--key=value` pairs.
        #[arg(
            value_name = "OPTION",
            num_args = 0..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        options: Vec<String>,
    },
    /// Deletes a resource after confirmation.
    Delete {
        /// Resource name.
        name: String,
        /// Skips the confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,
    },
}
