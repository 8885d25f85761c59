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

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Underlying cause of a failure against a backing store.
///
/// Depending on the store this can be an I/O error, a serializer error, or
/// an SQLite error.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    /// The parent directory for a backing store could not be created.
    #[error("could not create directory {path:?}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The initial empty backing file or table could not be created.
    #[error("could not create backing store {path:?}")]
    BackingCreate {
        path: PathBuf,
        #[source]
        source: Cause,
    },
    /// The backing store exists but is unreadable or malformed.
    #[error("backing store {path:?} is unreadable or malformed")]
    BackingRead {
        path: PathBuf,
        #[source]
        source: Cause,
    },
    /// A write to the backing store failed. The in-memory mapping is left
    /// as it was before the call.
    #[error("could not persist to backing store {path:?}")]
    Persist {
        path: PathBuf,
        #[source]
        source: Cause,
    },
    #[error("config key {0:?} not found")]
    KeyNotFound(String),
    #[error("instance {0:?} has not been created")]
    InstanceNotFound(String),
    #[error("instance {0:?} is not of the requested type")]
    InstanceWrongType(String),
    #[error("message {0} not found in the selected mailbox")]
    MessageNotFound(u32),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Imap(#[from] imap::Error),
    #[error(transparent)]
    Tls(#[from] native_tls::Error),
}
