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

use super::{apply, ConfigStore, Value};
use crate::support::{error::Error, file_ops};

/// Mode for backing files created by the file-backed stores. Config
/// entries can hold credentials, so the files are owner-only.
pub(super) const FILE_MODE: u32 = 0o600;

/// A config store backed by a single file holding one UTF-8 JSON object.
///
/// ```no_run
/// use confstore::store::{ConfigStore, JsonConfig, Value};
///
/// let mut config = JsonConfig::open("/path/to/config.json")?;
/// config.set("text", Value::from("abc"))?;
/// assert_eq!(Some(&Value::from("abc")), config.get("text"));
/// # Ok::<(), confstore::Error>(())
/// ```
#[derive(Debug)]
pub struct JsonConfig {
    path: PathBuf,
    configs: BTreeMap<String, Value>,
}

impl JsonConfig {
    /// Opens the store at `path`, creating the parent directory and an
    /// empty backing file if they do not exist, then loads every entry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        create_parent_dir(&path)?;

        let _lock = file_ops::FileLock::exclusive(&path)?;
        if !path.exists() {
            info!("Creating empty config store at {:?}", path);
            file_ops::spit(&path, false, FILE_MODE, b"{}").map_err(|e| {
                Error::BackingCreate {
                    path: path.clone(),
                    source: e.into(),
                }
            })?;
        }

        let configs = load_json_object(&path)?;
        Ok(Self { path, configs })
    }

    fn persist(&self, configs: &BTreeMap<String, Value>) -> Result<(), Error> {
        let persist_error = |source: crate::support::error::Cause| {
            Error::Persist {
                path: self.path.clone(),
                source,
            }
        };
        let data =
            serde_json::to_vec(configs).map_err(|e| persist_error(e.into()))?;
        let _lock = file_ops::FileLock::exclusive(&self.path)?;
        file_ops::spit(&self.path, true, FILE_MODE, &data)
            .map_err(|e| persist_error(e.into()))
    }
}

impl ConfigStore for JsonConfig {
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

/// Creates the parent directory of `path` if it does not exist.
pub(super) fn create_parent_dir(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| {
            Error::DirectoryCreate {
                path: parent.to_owned(),
                source,
            }
        })?;
    }
    Ok(())
}

/// Reads and parses `path` as a JSON object.
///
/// An empty or whitespace-only file loads as the empty mapping.
pub(super) fn load_json_object(
    path: &Path,
) -> Result<BTreeMap<String, Value>, Error> {
    let contents = fs::read(path).map_err(|e| Error::BackingRead {
        path: path.to_owned(),
        source: e.into(),
    })?;
    if contents.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(BTreeMap::new());
    }
    serde_json::from_slice(&contents).map_err(|e| Error::BackingRead {
        path: path.to_owned(),
        source: e.into(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn lazy_create_then_concrete_scenario() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("data").join("config.json");

        let mut config = JsonConfig::open(&path).unwrap();
        assert!(config.get_all().is_empty());
        assert_eq!("{}", fs::read_to_string(&path).unwrap());

        config.set("text", Value::from("abc")).unwrap();
        assert_eq!(Some(&Value::from("abc")), config.get("text"));
        assert_eq!(
            r#"{"text":"abc"}"#,
            fs::read_to_string(&path).unwrap()
        );

        config.set("text", Value::Null).unwrap();
        assert_eq!(None, config.get("text"));
        assert_matches!(Err(Error::KeyNotFound(_)), config.require("text"));
        assert_eq!("{}", fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn reopen_sees_persisted_state() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("config.json");

        let mut configs = BTreeMap::new();
        configs.insert("number".to_owned(), Value::from(42));
        configs.insert(
            "nested".to_owned(),
            serde_json::json!({"a": [1, 2, 3], "b": "c"}),
        );

        let mut config = JsonConfig::open(&path).unwrap();
        config.set_all(configs.clone()).unwrap();
        drop(config);

        let reopened = JsonConfig::open(&path).unwrap();
        assert_eq!(&configs, reopened.get_all());
    }

    #[test]
    fn delete_is_idempotent() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("config.json");
        let mut config = JsonConfig::open(&path).unwrap();

        // Deleting an absent key is a no-op.
        config.set("missing", Value::Null).unwrap();
        assert!(config.get_all().is_empty());

        config.set("key", Value::from(1)).unwrap();
        config.set("key", Value::Null).unwrap();
        let after_once = fs::read_to_string(&path).unwrap();
        config.set("key", Value::Null).unwrap();
        assert_eq!(after_once, fs::read_to_string(&path).unwrap());
        assert!(config.get_all().is_empty());
    }

    #[test]
    fn null_removes_across_calls() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("config.json");
        let mut config = JsonConfig::open(&path).unwrap();

        let mut first = BTreeMap::new();
        first.insert("k".to_owned(), Value::from("v1"));
        config.set_all(first).unwrap();

        let mut second = BTreeMap::new();
        second.insert("k".to_owned(), Value::Null);
        config.set_all(second).unwrap();

        assert_eq!(None, config.get("k"));
        let reopened = JsonConfig::open(&path).unwrap();
        assert_eq!(None, reopened.get("k"));
    }

    #[test]
    fn malformed_backing_is_a_read_error() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("config.json");
        fs::write(&path, "not json at all").unwrap();

        assert_matches!(
            Err(Error::BackingRead { .. }),
            JsonConfig::open(&path)
        );
    }

    #[test]
    fn failed_persist_leaves_mapping_untouched() {
        let tmpdir = TempDir::new().unwrap();
        let dir = tmpdir.path().join("data");
        let path = dir.join("config.json");
        let mut config = JsonConfig::open(&path).unwrap();
        config.set("keep", Value::from(1)).unwrap();

        // With the backing directory gone the rewrite cannot land.
        fs::remove_dir_all(&dir).unwrap();
        assert!(config.set("lost", Value::from(2)).is_err());
        assert_eq!(None, config.get("lost"));
        assert_eq!(Some(&Value::from(1)), config.get("keep"));
    }

    #[test]
    fn backing_file_is_created_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("config.json");
        let mut config = JsonConfig::open(&path).unwrap();
        assert_eq!(
            0o600,
            fs::metadata(&path).unwrap().permissions().mode() & 0o777
        );

        config.set("pass", Value::from("hunter2")).unwrap();
        assert_eq!(
            0o600,
            fs::metadata(&path).unwrap().permissions().mode() & 0o777
        );
    }

    #[test]
    fn store_formats_for_diagnostics() {
        let tmpdir = TempDir::new().unwrap();
        let config =
            JsonConfig::open(tmpdir.path().join("config.json")).unwrap();
        assert!(format!("{:?}", config).contains("JsonConfig"));
    }

    #[test]
    fn typed_accessors() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("config.json");
        let mut config = JsonConfig::open(&path).unwrap();

        config.set_to("retries", &3u32).unwrap();
        assert_eq!(3u32, config.get_as::<u32>("retries").unwrap());
        assert_matches!(
            Err(Error::KeyNotFound(_)),
            config.get_as::<u32>("absent")
        );
    }

    fn scalar_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[ -~]{0,16}".prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn round_trip(
            configs in prop::collection::btree_map(
                "[a-z]{1,8}", scalar_value(), 0..8)
        ) {
            let tmpdir = TempDir::new().unwrap();
            let path = tmpdir.path().join("config.json");

            let mut config = JsonConfig::open(&path).unwrap();
            config.set_all(configs.clone()).unwrap();
            drop(config);

            let reopened = JsonConfig::open(&path).unwrap();
            prop_assert_eq!(&configs, reopened.get_all());
        }
    }
}
