//! Handlers for the `rack resources` command family.

use std::io::{BufRead, Write};
use std::process::ExitCode;

use tracing::info;

use crate::AppError;
use crate::cli::ResourcesAction;
use crate::client::ApiClient;
use crate::output::{
    created_status, creating_prefix, deleted_status, deleting_prefix, render_parameters,
    render_resource_info, render_resource_list, updated_status, updating_prefix,
};
use crate::prompt::confirm;

/// Key/value options gathered from `--key=value` tokens, in command-line order.
pub(crate) type Options = Vec<(String, String)>;

pub(crate) fn execute<R, W>(
    action: Option<ResourcesAction>,
    client: &ApiClient,
    stdin: &mut R,
    stdout: &mut W,
) -> Result<ExitCode, AppError>
where
    R: BufRead,
    W: Write,
{
    match action {
        None => list(client, stdout),
        Some(ResourcesAction::Info { name }) => info(client, &name, stdout),
        Some(ResourcesAction::Create { kind, options }) => {
            create(client, &kind, parse_options(&options)?, stdout)
        }
        Some(ResourcesAction::Update { name, options }) => {
            update(client, &name, parse_options(&options)?, stdout)
        }
        Some(ResourcesAction::Delete { name, yes }) => delete(client, &name, yes, stdin, stdout),
    }
}

fn list<W: Write>(client: &ApiClient, stdout: &mut W) -> Result<ExitCode, AppError> {
    let resources = client.list()?;
    emit(stdout, &render_resource_list(&resources))
}

fn info<W: Write>(client: &ApiClient, name: &str, stdout: &mut W) -> Result<ExitCode, AppError> {
    let resource = client.get(name)?;
    emit(stdout, &render_resource_info(&resource))
}

fn create<W: Write>(
    client: &ApiClient,
    kind: &str,
    mut options: Options,
    stdout: &mut W,
) -> Result<ExitCode, AppError> {
    let name = take_option(&mut options, "name");
    let resource = client.create(kind, name.as_deref(), &options)?;
    let display_name = name.as_deref().unwrap_or(resource.name.as_str());
    info!(resource = display_name, kind, "resource create requested");

    let shown = name
        .as_deref()
        .map(|value| ("name", value))
        .into_iter()
        .chain(options.iter().map(|(key, value)| (key.as_str(), value.as_str())));
    let line = format!(
        "{}{}\n",
        creating_prefix(display_name, kind, &render_parameters(shown)),
        created_status(&resource)
    );
    emit(stdout, &line)
}

fn update<W: Write>(
    client: &ApiClient,
    name: &str,
    options: Options,
    stdout: &mut W,
) -> Result<ExitCode, AppError> {
    if options.is_empty() {
        return Err(AppError::NothingToUpdate);
    }
    let resource = client.update(name, &options)?;
    info!(resource = name, "resource update requested");

    let shown = options
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()));
    let line = format!(
        "{}{}\n",
        updating_prefix(name, &render_parameters(shown)),
        updated_status(&resource)
    );
    emit(stdout, &line)
}

fn delete<R, W>(
    client: &ApiClient,
    name: &str,
    skip_confirmation: bool,
    stdin: &mut R,
    stdout: &mut W,
) -> Result<ExitCode, AppError>
where
    R: BufRead,
    W: Write,
{
    if !skip_confirmation {
        let question = format!("Are you sure you want to delete {name}?");
        if !confirm(stdin, stdout, &question)? {
            info!(resource = name, "delete declined");
            return Ok(ExitCode::FAILURE);
        }
    }
    let resource = client.delete(name)?;
    info!(resource = name, "resource delete requested");
    let line = format!("{}{}\n", deleting_prefix(name), deleted_status(&resource));
    emit(stdout, &line)
}

fn emit<W: Write>(stdout: &mut W, text: &str) -> Result<ExitCode, AppError> {
    stdout
        .write_all(text.as_bytes())
        .map_err(AppError::WriteOutput)?;
    stdout.flush().map_err(AppError::WriteOutput)?;
    Ok(ExitCode::SUCCESS)
}

/// Parses `--key=value` and `--key value` tokens.
pub(crate) fn parse_options(tokens: &[String]) -> Result<Options, AppError> {
    let mut options = Options::new();
    let mut tokens = tokens.iter();
    while let Some(token) = tokens.next() {
        let Some(flag) = token.strip_prefix("--").filter(|flag| !flag.is_empty()) else {
            return Err(AppError::InvalidOption(token.clone()));
        };
        let (key, value) = match flag.split_once('=') {
            Some((key, value)) => (key.to_owned(), value.to_owned()),
            None => {
                let value = tokens
                    .next()
                    .ok_or_else(|| AppError::MissingOptionValue(flag.to_owned()))?;
                (flag.to_owned(), value.clone())
            }
        };
        if key.is_empty() {
            return Err(AppError::InvalidOption(token.clone()));
        }
        options.push((key, value));
    }
    Ok(options)
}

fn take_option(options: &mut Options, key: &str) -> Option<String> {
    let position = options.iter().position(|(candidate, _)| candidate == key)?;
    Some(options.remove(position).1)
}
