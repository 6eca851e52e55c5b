//! Human-readable rendering of API responses.
//!
//! Tables and key/value blocks share one alignment rule: every column is
//! padded to its widest cell and columns are separated by two spaces. The
//! status lines printed by mutating commands are literal formats; create puts a
//! space before the status while update does not, and both are kept as is.

mod table;

use crate::client::Resource;

pub(crate) use table::{KeyValue, Table};

const DEFAULT_CREATE_STATUS: &str = "CREATING";
const DEFAULT_UPDATE_STATUS: &str = "UPDATING";
const DEFAULT_DELETE_STATUS: &str = "DELETING";

/// Renders `rack resources`.
pub(crate) fn render_resource_list(resources: &[Resource]) -> String {
    let mut table = Table::new(["NAME", "TYPE", "STATUS"]);
    for resource in resources {
        table.add_row([
            resource.name.as_str(),
            resource.kind.as_str(),
            resource.status.as_str(),
        ]);
    }
    table.render()
}

/// Renders `rack resources info`.
pub(crate) fn render_resource_info(resource: &Resource) -> String {
    let mut info = KeyValue::default();
    info.add("Name", resource.name.as_str());
    info.add("Status", resource.status.as_str());
    if !resource.url.is_empty() {
        info.add("URL", resource.url.as_str());
    }
    info.render()
}

/// Renders `key="value"` pairs separated by spaces.
pub(crate) fn render_parameters<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    params
        .into_iter()
        .map(|(key, value)| format!("{key}=\"{value}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Leading part of the create status line, joined with the status once the API answers.
pub(crate) fn creating_prefix(name: &str, kind: &str, params: &str) -> String {
    format!("Creating {name} ({kind}: {params})... ")
}

/// Leading part of the update status line, joined with the status once the API answers.
pub(crate) fn updating_prefix(name: &str, params: &str) -> String {
    format!("Updating {name} ({params})...")
}

/// Leading part of the delete status line, joined with the status once the API answers.
pub(crate) fn deleting_prefix(name: &str) -> String {
    format!("Deleting {name}... ")
}

/// Upper-cased status reported by a create call.
pub(crate) fn created_status(resource: &Resource) -> String {
    status_or(resource, DEFAULT_CREATE_STATUS)
}

/// Upper-cased status reported by an update call.
pub(crate) fn updated_status(resource: &Resource) -> String {
    status_or(resource, DEFAULT_UPDATE_STATUS)
}

/// Upper-cased status reported by a delete call.
pub(crate) fn deleted_status(resource: &Resource) -> String {
    status_or(resource, DEFAULT_DELETE_STATUS)
}

fn status_or(resource: &Resource, fallback: &str) -> String {
    if resource.status.is_empty() {
        fallback.to_owned()
    } else {
        resource.status.to_uppercase()
    }
}
