//-
// Copyright (c) 2026, the Confstore developers
//
// This file is part of Confstore.
//
// Confstore is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Confstore is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Confstore. If not, see <http://www.gnu.org/licenses/>.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use super::json::{create_parent_dir, load_json_object, FILE_MODE};
use super::{apply, ConfigStore, Value};
use crate::support::{
    error::{Cause, Error},
    file_ops,
};

/// Serialized form of a [`LiteConfig`] backing file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Storage {
    Json,
    Toml,
}

impl Storage {
    /// Conventional file extension for the format.
    pub fn extension(self) -> &'static str {
        match self {
            Storage::Json => "json",
            Storage::Toml => "toml",
        }
    }

    fn empty(self) -> &'static [u8] {
        match self {
            Storage::Json => b"{}",
            // An empty document is a valid empty table.
            Storage::Toml => b"",
        }
    }
}

/// A config store over a file in either of two self-describing text
/// formats, chosen at open time.
///
/// The contract is identical to [`JsonConfig`](super::JsonConfig); the TOML
/// form suits backing files that are also edited by hand. TOML cannot
/// represent a `null` or a mixed-type array nested inside a retained value;
/// persisting such a value fails with [`Error::Persist`].
#[derive(Debug)]
pub struct LiteConfig {
    path: PathBuf,
    storage: Storage,
    configs: BTreeMap<String, Value>,
}

impl LiteConfig {
    /// Opens the store at `path` in the given format, creating the parent
    /// directory and an empty backing file if they do not exist, then loads
    /// every entry.
    pub fn open(
        path: impl Into<PathBuf>,
        storage: Storage,
    ) -> Result<Self, Error> {
        let path = path.into();
        create_parent_dir(&path)?;

        let _lock = file_ops::FileLock::exclusive(&path)?;
        if !path.exists() {
            info!("Creating empty config store at {:?}", path);
            file_ops::spit(&path, false, FILE_MODE, storage.empty())
                .map_err(|e| Error::BackingCreate {
                    path: path.clone(),
                    source: e.into(),
                })?;
        }

        let configs = match storage {
            Storage::Json => load_json_object(&path)?,
            Storage::Toml => load_toml_table(&path)?,
        };
        Ok(Self {
            path,
            storage,
            configs,
        })
    }

    pub fn storage(&self) -> Storage {
        self.storage
    }

    fn persist(&self, configs: &BTreeMap<String, Value>) -> Result<(), Error> {
        let data = match self.storage {
            Storage::Json => serde_json::to_vec(configs)
                .map_err(|e| self.persist_error(e.into()))?,
            Storage::Toml => {
                let table = json_to_toml_table(configs)
                    .map_err(|e| self.persist_error(e))?;
                toml::to_string(&toml::Value::Table(table))
                    .map_err(|e| self.persist_error(e.into()))?
                    .into_bytes()
            }
        };
        let _lock = file_ops::FileLock::exclusive(&self.path)?;
        file_ops::spit(&self.path, true, FILE_MODE, &data)
            .map_err(|e| self.persist_error(e.into()))
    }

    fn persist_error(&self, source: Cause) -> Error {
        Error::Persist {
            path: self.path.clone(),
            source,
        }
    }
}

impl ConfigStore for LiteConfig {
    fn location(&self) -> &Path {
        &self.path
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.configs.get(key)
    }

    fn get_all(&self) -> &BTreeMap<String, Value> {
        &self.configs
    }

    fn set_all(
        &mut self,
        configs: BTreeMap<String, Value>,
    ) -> Result<(), Error> {
        let mut updated = self.configs.clone();
        apply(&mut updated, configs);
        self.persist(&updated)?;
        // The mapping mirrors the backing file only once the rewrite has
        // landed.
        self.configs = updated;
        Ok(())
    }
}

fn load_toml_table(path: &Path) -> Result<BTreeMap<String, Value>, Error> {
    let read_error = |source: Cause| Error::BackingRead {
        path: path.to_owned(),
        source,
    };
    let contents =
        fs::read_to_string(path).map_err(|e| read_error(e.into()))?;
    let table: toml::value::Table =
        toml::from_str(&contents).map_err(|e| read_error(e.into()))?;
    Ok(table
        .into_iter()
        .map(|(key, value)| (key, toml_to_json(value)))
        .collect())
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(a) => {
            Value::Array(a.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(t) => Value::Object(
            t.into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}

fn json_to_toml_table(
    configs: &BTreeMap<String, Value>,
) -> Result<toml::value::Table, Cause> {
    json_to_toml_entries(configs.iter())
}

/// TOML requires that, within a table, plain values precede sub-tables
/// (and arrays of tables, which serialize as `[[section]]`s), so entries
/// are emitted non-tables first.
fn json_to_toml_entries<'a>(
    entries: impl Iterator<Item = (&'a String, &'a Value)> + Clone,
) -> Result<toml::value::Table, Cause> {
    fn table_like(value: &Value) -> bool {
        match value {
            Value::Object(_) => true,
            Value::Array(a) => a.iter().any(|e| e.is_object()),
            _ => false,
        }
    }

    let mut table = toml::value::Table::new();
    for (key, value) in entries.clone().filter(|(_, v)| !table_like(v)) {
        table.insert(key.clone(), json_to_toml(value)?);
    }
    for (key, value) in entries.filter(|(_, v)| table_like(v)) {
        table.insert(key.clone(), json_to_toml(value)?);
    }
    Ok(table)
}

fn json_to_toml(value: &Value) -> Result<toml::Value, Cause> {
    Ok(match value {
        Value::Null => return Err("TOML cannot represent null".into()),
        Value::Bool(b) => toml::Value::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                toml::Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                toml::Value::Float(f)
            } else {
                return Err(
                    format!("number {} does not fit TOML", n).into()
                );
            }
        }
        Value::String(s) => toml::Value::String(s.clone()),
        Value::Array(a) => toml::Value::Array(
            a.iter().map(json_to_toml).collect::<Result<_, _>>()?,
        ),
        Value::Object(o) => {
            toml::Value::Table(json_to_toml_entries(o.iter())?)
        }
    })
}
