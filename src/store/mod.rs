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

//! The key-value config stores.
//!
//! Each store owns one backing location (a file or an SQLite database),
//! mirrors its full contents in memory, and rewrites the backing store
//! synchronously on every mutation. The back-ends differ only in how they
//! serialize the mapping; the shared contract lives in [`ConfigStore`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
pub use serde_json::Value;

use crate::support::error::Error;

mod json;
mod lite;
mod sqlite;

pub use self::json::JsonConfig;
pub use self::lite::{LiteConfig, Storage};
pub use self::sqlite::SqliteConfig;

/// The load/query/mutate/persist contract shared by every backing store.
///
/// The in-memory mapping is a faithful, fully loaded mirror of the backing
/// store after `open` and after every successful `set`/`set_all`; there is
/// no partial-load or write-ahead state.
///
/// A `null` value means "absent": setting a key to `Value::Null` removes it
/// both from the mapping and from the persisted form, so a persisted store
/// never contains null entries.
pub trait ConfigStore {
    /// The path of the backing file or database.
    fn location(&self) -> &Path;

    /// Returns the in-memory value for `key`, without touching the backing
    /// store.
    fn get(&self, key: &str) -> Option<&Value>;

    /// A view of the full in-memory mapping.
    fn get_all(&self) -> &BTreeMap<String, Value>;

    /// Applies the non-null-upserts/null-removes rule to every pair, then
    /// persists once.
    ///
    /// Pairs are applied in the map's key order. The input carries at most
    /// one value per key, so there is no within-call conflict to resolve;
    /// across calls, the last call wins. This is the preferred path for
    /// bulk updates.
    fn set_all(&mut self, configs: BTreeMap<String, Value>)
        -> Result<(), Error>;

    /// Upserts `key` (or removes it, if `value` is `Value::Null`) and
    /// persists.
    ///
    /// Defined as `set_all` of a one-entry map: every call rewrites the
    /// whole backing store, so the I/O cost is proportional to the store
    /// size. Use [`ConfigStore::set_all`] for multi-key updates.
    fn set(&mut self, key: &str, value: Value) -> Result<(), Error> {
        let mut configs = BTreeMap::new();
        configs.insert(key.to_owned(), value);
        self.set_all(configs)
    }

    /// Like [`ConfigStore::get`], but an absent key is a typed error.
    fn require(&self, key: &str) -> Result<&Value, Error> {
        self.get(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))
    }

    /// Deserializes the value stored under `key` into a `T`.
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, Error> {
        Ok(serde_json::from_value(self.require(key)?.clone())?)
    }

    /// Serializes `value` and stores it under `key`.
    fn set_to<T: Serialize>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<(), Error> {
        self.set(key, serde_json::to_value(value)?)
    }
}

/// Applies the non-null-upserts/null-removes rule to `target`.
pub(crate) fn apply(
    target: &mut BTreeMap<String, Value>,
    configs: BTreeMap<String, Value>,
) {
    for (key, value) in configs {
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}
