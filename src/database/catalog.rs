//! Resource specs derived from the live database catalog.

use inflector::Inflector;
use std::collections::HashMap;

use crate::resource::ResourceSpec;

/// Column names never offered to omni-search
const SECRET_COLUMNS: &[&str] = &["old_password", "password", "token"];

const TEXT_TYPES: &[&str] = &[
    "character varying",
    "character",
    "text",
    "citext",
    "varchar",
    "char",
    "longtext",
    "mediumtext",
    "tinytext",
    "enum",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKey {
    Primary,
    Unique,
    None,
}

impl ColumnKey {
    pub fn parse(constraint: &str) -> Self {
        match constraint.to_ascii_uppercase().as_str() {
            "PRIMARY KEY" | "PRI" => ColumnKey::Primary,
            "UNIQUE" | "UNI" => ColumnKey::Unique,
            _ => ColumnKey::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub key: ColumnKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Group flat `(table, column)` catalog rows into tables, keeping row order.
pub fn group_columns(rows: Vec<(String, ColumnInfo)>) -> Vec<TableInfo> {
    let mut tables: Vec<TableInfo> = Vec::new();
    for (table, column) in rows {
        match tables.last_mut() {
            Some(last) if last.name == table => last.columns.push(column),
            _ => tables.push(TableInfo { name: table, columns: vec![column] }),
        }
    }
    tables
}

/// Lower-case the table name, singularize each `_`, `-` or space separated
/// word and join them with `-`.
pub fn slug(table: &str) -> String {
    table
        .to_lowercase()
        .split(|c| c == '_' || c == '-' || c == ' ')
        .map(|word| if word.is_empty() { String::new() } else { word.to_singular() })
        .collect::<Vec<_>>()
        .join("-")
}

/// Build the spec for one table. Returns `None` for tables whose route name
/// would start with `-` (e.g. `_migrations`).
pub fn resource_spec(
    table: &TableInfo,
    active_field: &str,
    pk_overrides: &HashMap<String, Vec<String>>,
) -> Option<ResourceSpec> {
    let name = slug(&table.name);
    if name.starts_with('-') {
        return None;
    }

    let keyed = |key: ColumnKey| -> Vec<String> {
        table
            .columns
            .iter()
            .filter(|c| c.key == key)
            .map(|c| c.name.clone())
            .collect()
    };
    let mut id_columns = keyed(ColumnKey::Primary);
    if id_columns.is_empty() {
        id_columns = keyed(ColumnKey::Unique);
    }
    // Decided before overrides: a forced key does not make a view writable
    let writable = !id_columns.is_empty();
    if let Some(forced) = pk_overrides.get(&table.name) {
        id_columns = forced.clone();
    }

    let search_columns = table
        .columns
        .iter()
        .filter(|c| is_text(&c.data_type) && !SECRET_COLUMNS.contains(&c.name.as_str()))
        .map(|c| c.name.clone())
        .collect();

    let active_field = active_field.to_lowercase();
    let active_column = table
        .columns
        .iter()
        .find(|c| c.name.to_lowercase() == active_field)
        .map(|c| c.name.clone());

    Some(ResourceSpec {
        name,
        table: table.name.clone(),
        columns: table.columns.iter().map(|c| c.name.clone()).collect(),
        search_columns,
        id_columns,
        active_column,
        writable,
    })
}

/// Specs for every servable table, optionally restricted to `only`.
pub fn resource_specs(
    tables: &[TableInfo],
    active_field: &str,
    pk_overrides: &HashMap<String, Vec<String>>,
    only: &[String],
) -> Vec<ResourceSpec> {
    tables
        .iter()
        .filter(|t| only.is_empty() || only.contains(&t.name))
        .filter_map(|t| resource_spec(t, active_field, pk_overrides))
        .collect()
}

fn is_text(data_type: &str) -> bool {
    TEXT_TYPES.contains(&data_type.to_lowercase().as_str())
}
