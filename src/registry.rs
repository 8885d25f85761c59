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

//! Registry of named instances.
//!
//! This replaces implicit static singletons: build one `Registry` near the
//! top of the process, put shared instances in it, and pass it by reference
//! to the code that needs lookup by name.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::support::error::Error;

type Instance = Arc<dyn Any + Send + Sync>;

/// A mapping from name to owned instance.
///
/// Instances are type-erased on the way in and recovered by concrete type
/// on the way out; asking for the wrong type is a typed error rather than a
/// panic.
///
/// ```
/// use std::sync::Arc;
/// use confstore::registry::Registry;
///
/// let registry = Registry::new();
/// registry.insert("greeting", Arc::new("hello".to_owned()));
/// let greeting = registry.get::<String>("greeting").unwrap();
/// assert_eq!("hello", *greeting);
/// ```
#[derive(Default)]
pub struct Registry {
    instances: Mutex<HashMap<String, Instance>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `instance` under `id`, displacing any previous instance
    /// with that name.
    pub fn insert<T: Any + Send + Sync>(
        &self,
        id: impl Into<String>,
        instance: Arc<T>,
    ) {
        self.instances.lock().unwrap().insert(id.into(), instance);
    }

    /// Looks up the instance registered under `id`.
    pub fn get<T: Any + Send + Sync>(
        &self,
        id: &str,
    ) -> Result<Arc<T>, Error> {
        let instances = self.instances.lock().unwrap();
        let instance = instances
            .get(id)
            .ok_or_else(|| Error::InstanceNotFound(id.to_owned()))?;
        Arc::clone(instance)
            .downcast::<T>()
            .map_err(|_| Error::InstanceWrongType(id.to_owned()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.instances.lock().unwrap().contains_key(id)
    }

    /// Removes the instance registered under `id`, returning whether one
    /// was present.
    pub fn remove(&self, id: &str) -> bool {
        self.instances.lock().unwrap().remove(id).is_some()
    }
}
