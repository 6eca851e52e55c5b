//! Configuration loading helpers for the Rack CLI.
//!
//! Leading configuration flags are split from the command tokens so
//! `ortho_config` only sees the flags it understands while clap parses the
//! command itself.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use rack_config::Config;

use crate::AppError;

/// CLI flags recognised by the configuration loader.
///
/// Keep in sync with the fields of [`rack_config::Config`].
const CONFIG_CLI_FLAGS: &[&str] = &["--config-path", "--host", "--log-filter", "--log-format"];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// Configuration flags must appear before the command. Anything after the
    /// first command token belongs to the command.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

/// Loader backed by the layered `ortho_config` sources.
pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

/// Loader that hands out a configuration fixed by the caller.
pub(crate) struct FixedConfigLoader {
    config: Config,
}

impl FixedConfigLoader {
    pub(crate) const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for FixedConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn process_config_flag(argument: &OsStr) -> FlagAction {
    let argument_text = argument.to_string_lossy();
    if !argument_text.starts_with("--") {
        return FlagAction::Skip;
    }

    let (flag, has_inline_value) = match argument_text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (&*argument_text, false),
    };

    if CONFIG_CLI_FLAGS.contains(&flag) {
        return FlagAction::Include {
            needs_value: !has_inline_value,
        };
    }

    FlagAction::Skip
}

/// Configuration arguments (with the program name) and the command tokens.
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_arguments: Vec::new(),
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut remaining = rest.iter().peekable();
    while let Some(argument) = remaining.peek() {
        match process_config_flag(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push((*argument).clone());
                remaining.next();
                if needs_value && let Some(value) = remaining.next() {
                    config_arguments.push(value.clone());
                }
            }
            FlagAction::Skip => break,
        }
    }

    let mut command_arguments = vec![program.clone()];
    command_arguments.extend(remaining.cloned());
    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os_args(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    #[test]
    fn inline_value_flags_do_not_need_follow_up_value() {
        let result = process_config_flag(OsStr::new("--host=http://127.0.0.1:1"));
        assert_eq!(result, FlagAction::Include { needs_value: false });
    }

    #[test]
    fn separate_value_flags_consume_following_argument() {
        let result = process_config_flag(OsStr::new("--log-filter"));
        assert_eq!(result, FlagAction::Include { needs_value: true });
    }

    #[test]
    fn non_flag_arguments_signal_stop() {
        assert_eq!(process_config_flag(OsStr::new("resources")), FlagAction::Skip);
    }

    #[test]
    fn unknown_flags_are_skipped() {
        assert_eq!(process_config_flag(OsStr::new("--name=x")), FlagAction::Skip);
    }

    #[test]
    fn splits_leading_configuration_from_command() {
        let split = split_config_arguments(&os_args(&[
            "rack",
            "--host",
            "http://127.0.0.1:9",
            "--log-format=json",
            "resources",
            "create",
            "syslog",
            "--name=a",
        ]));
        assert_eq!(
            split.config_arguments,
            os_args(&["rack", "--host", "http://127.0.0.1:9", "--log-format=json"])
        );
        assert_eq!(
            split.command_arguments,
            os_args(&["rack", "resources", "create", "syslog", "--name=a"])
        );
    }

    #[test]
    fn configuration_flags_after_the_command_stay_with_it() {
        let split = split_config_arguments(&os_args(&["rack", "resources", "--host", "x"]));
        assert_eq!(split.config_arguments, os_args(&["rack"]));
        assert_eq!(
            split.command_arguments,
            os_args(&["rack", "resources", "--host", "x"])
        );
    }

    #[test]
    fn layered_loader_applies_leading_host_flag() {
        let config = OrthoConfigLoader
            .load(&os_args(&["rack", "--host", "http://127.0.0.1:9"]))
            .expect("configuration loads");
        assert_eq!(config.host(), "http://127.0.0.1:9");
    }

    #[test]
    fn empty_arguments_split_to_nothing() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert!(split.command_arguments.is_empty());
    }
}
