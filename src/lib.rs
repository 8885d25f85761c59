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

//! Confstore is a small collection of configuration-storage helpers:
//! three interchangeable key-value config stores (flat JSON file, JSON/TOML
//! hybrid file, SQLite table), a registry of named instances, and a thin
//! IMAP mail-reading wrapper.
//!
//! Every store implements [`store::ConfigStore`]: the backing store is
//! loaded fully into memory at open time and rewritten synchronously on
//! every mutation, with a `null` value meaning "remove the key".

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod mail;
pub mod registry;
pub mod store;
pub mod support;

pub use crate::registry::Registry;
pub use crate::store::{
    ConfigStore, JsonConfig, LiteConfig, SqliteConfig, Storage, Value,
};
pub use crate::support::error::Error;
