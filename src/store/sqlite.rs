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
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use rusqlite::OptionalExtension as _;

use super::json::create_parent_dir;
use super::{apply, ConfigStore, Value};
use crate::support::{
    error::{Cause, Error},
    file_ops,
};

/// A config store backed by a single two-column SQLite table.
///
/// Values are stored as JSON text in `config_value`, keyed by the unique
/// `config_key` column. Unlike the file-backed stores, mutation persists
/// per key: an upsert touches only the affected row, and a whole `set_all`
/// batch commits in one transaction, so a crash mid-batch never leaves the
/// table half-updated.
#[derive(Debug)]
pub struct SqliteConfig {
    path: PathBuf,
    cxn: rusqlite::Connection,
    configs: BTreeMap<String, Value>,
}

impl SqliteConfig {
    /// Opens the database at `path`, creating the parent directory, the
    /// database file, and the `config` table as needed, then loads every
    /// row into memory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        create_parent_dir(&path)?;

        let create_error = |source: Cause| Error::BackingCreate {
            path: path.clone(),
            source,
        };
        let cxn = rusqlite::Connection::open_with_flags(
            &path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| create_error(e.into()))?;

        // The table can hold credentials; keep the database owner-only.
        let _ = file_ops::chmod(&path, 0o600);

        cxn.busy_timeout(Duration::from_secs(10))?;
        if !table_exists(&cxn)? {
            info!("Creating config table in {:?}", path);
            cxn.execute(
                "CREATE TABLE `config` (\
                 `config_key` TEXT UNIQUE NOT NULL PRIMARY KEY, \
                 `config_value` TEXT\
                 )",
                (),
            )
            .map_err(|e| create_error(e.into()))?;
        }

        let configs = load_table(&cxn, &path)?;
        Ok(Self { path, cxn, configs })
    }
}

impl ConfigStore for SqliteConfig {
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
        persist_batch(&mut self.cxn, &configs).map_err(|source| {
            Error::Persist {
                path: self.path.clone(),
                source,
            }
        })?;
        // The mapping mirrors the table only once the batch has committed.
        apply(&mut self.configs, configs);
        Ok(())
    }
}

fn table_exists(cxn: &rusqlite::Connection) -> Result<bool, Error> {
    cxn.prepare(
        "SELECT 1 FROM `sqlite_master` \
         WHERE `type` = 'table' AND `name` = 'config'",
    )?
    .exists(())
    .map_err(Into::into)
}

fn load_table(
    cxn: &rusqlite::Connection,
    path: &Path,
) -> Result<BTreeMap<String, Value>, Error> {
    let read_error = |source: Cause| Error::BackingRead {
        path: path.to_owned(),
        source,
    };
    let mut stmt = cxn
        .prepare("SELECT `config_key`, `config_value` FROM `config`")
        .map_err(|e| read_error(e.into()))?;
    let rows = stmt
        .query_map((), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| read_error(e.into()))?;

    let mut configs = BTreeMap::new();
    for row in rows {
        let (key, serialized) = row.map_err(|e| read_error(e.into()))?;
        let value = serde_json::from_str(&serialized)
            .map_err(|e| read_error(e.into()))?;
        configs.insert(key, value);
    }
    Ok(configs)
}

/// For each pair: a null value deletes the row; otherwise the row is
/// inserted if absent, or updated if present with a different value. The
/// whole batch runs in one transaction.
fn persist_batch(
    cxn: &mut rusqlite::Connection,
    configs: &BTreeMap<String, Value>,
) -> Result<(), Cause> {
    let txn = cxn.transaction()?;
    for (key, value) in configs {
        if value.is_null() {
            txn.prepare_cached(
                "DELETE FROM `config` WHERE `config_key` = ?",
            )?
            .execute((key,))?;
            continue;
        }

        let serialized = serde_json::to_string(value)?;
        let existing = txn
            .prepare_cached(
                "SELECT `config_value` FROM `config` \
                 WHERE `config_key` = ?",
            )?
            .query_row((key,), |row| row.get::<_, String>(0))
            .optional()?;
        match existing {
            None => {
                txn.prepare_cached(
                    "INSERT INTO `config` (`config_key`, `config_value`) \
                     VALUES (?, ?)",
                )?
                .execute((key, &serialized))?;
            }
            Some(ref old) if *old != serialized => {
                txn.prepare_cached(
                    "UPDATE `config` SET `config_value` = ? \
                     WHERE `config_key` = ?",
                )?
                .execute((&serialized, key))?;
            }
            Some(_) => (),
        }
    }
    txn.commit()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    fn raw_rows(path: &Path) -> Vec<(String, String)> {
        let cxn = rusqlite::Connection::open(path).unwrap();
        let mut stmt = cxn
            .prepare(
                "SELECT `config_key`, `config_value` FROM `config` \
                 ORDER BY `config_key`",
            )
            .unwrap();
        let rows = stmt
            .query_map((), |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap();
        rows.collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn insert_update_delete_rows() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("config.db");
        let mut config = SqliteConfig::open(&path).unwrap();

        config.set("a", Value::from(1)).unwrap();
        assert_eq!(
            vec![("a".to_owned(), "1".to_owned())],
            raw_rows(&path)
        );

        config.set("a", Value::from(2)).unwrap();
        assert_eq!(
            vec![("a".to_owned(), "2".to_owned())],
            raw_rows(&path)
        );

        config.set("a", Value::Null).unwrap();
        assert!(raw_rows(&path).is_empty());
        assert_eq!(None, config.get("a"));
    }

    #[test]
    fn lazy_create_then_reopen() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("data").join("config.db");

        let mut config = SqliteConfig::open(&path).unwrap();
        assert!(config.get_all().is_empty());

        let mut configs = BTreeMap::new();
        configs.insert("text".to_owned(), Value::from("abc"));
        configs.insert(
            "nested".to_owned(),
            serde_json::json!({"a": [1, 2], "b": true}),
        );
        config.set_all(configs.clone()).unwrap();
        drop(config);

        let reopened = SqliteConfig::open(&path).unwrap();
        assert_eq!(&configs, reopened.get_all());
    }

    #[test]
    fn batch_applies_deletes_and_upserts_together() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("config.db");
        let mut config = SqliteConfig::open(&path).unwrap();

        config.set("stale", Value::from("x")).unwrap();

        let mut batch = BTreeMap::new();
        batch.insert("stale".to_owned(), Value::Null);
        batch.insert("fresh".to_owned(), Value::from("y"));
        config.set_all(batch).unwrap();

        assert_eq!(
            vec![("fresh".to_owned(), "\"y\"".to_owned())],
            raw_rows(&path)
        );
        assert_eq!(None, config.get("stale"));
        assert_eq!(Some(&Value::from("y")), config.get("fresh"));
    }

    #[test]
    fn delete_of_absent_key_is_a_no_op() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("config.db");
        let mut config = SqliteConfig::open(&path).unwrap();

        config.set("missing", Value::Null).unwrap();
        assert!(config.get_all().is_empty());
        assert!(raw_rows(&path).is_empty());
    }

    #[test]
    fn database_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("config.db");
        drop(SqliteConfig::open(&path).unwrap());
        assert_eq!(
            0o600,
            std::fs::metadata(&path).unwrap().permissions().mode() & 0o777
        );
    }

    #[test]
    fn store_formats_for_diagnostics() {
        let tmpdir = TempDir::new().unwrap();
        let config =
            SqliteConfig::open(tmpdir.path().join("config.db")).unwrap();
        assert!(format!("{:?}", config).contains("SqliteConfig"));
    }

    #[test]
    fn malformed_row_is_a_read_error() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("config.db");
        drop(SqliteConfig::open(&path).unwrap());

        let cxn = rusqlite::Connection::open(&path).unwrap();
        cxn.execute(
            "INSERT INTO `config` (`config_key`, `config_value`) \
             VALUES ('bad', 'not json')",
            (),
        )
        .unwrap();
        drop(cxn);

        assert_matches!(
            Err(Error::BackingRead { .. }),
            SqliteConfig::open(&path)
        );
    }
}
