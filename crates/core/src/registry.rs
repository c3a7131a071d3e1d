// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide registry of live lock factories
//!
//! Holds factories without keeping them alive so deadlock detection can see
//! locks owned by every factory in the process. Dead references are pruned on
//! registration.

use crate::factory::LockTable;
use parking_lot::RwLock;
use std::sync::{Arc, LazyLock, Weak};

static INSTANCES: LazyLock<InstanceRegistry<LockTable>> = LazyLock::new(InstanceRegistry::new);

/// Non-owning collection of instances
#[derive(Debug)]
pub(crate) struct InstanceRegistry<T> {
    instances: RwLock<Vec<Weak<T>>>,
}

impl<T> InstanceRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            instances: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn register(&self, instance: &Arc<T>) {
        let mut instances = self.instances.write();
        instances.retain(|weak| weak.strong_count() > 0);
        instances.push(Arc::downgrade(instance));
    }

    /// Instances still reachable at the time of the call
    pub(crate) fn live(&self) -> Vec<Arc<T>> {
        self.instances.read().iter().filter_map(Weak::upgrade).collect()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.instances
            .read()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.instances.read().len()
    }
}

pub(crate) fn register(table: &Arc<LockTable>) {
    INSTANCES.register(table);
}

pub(crate) fn live_tables() -> Vec<Arc<LockTable>> {
    INSTANCES.live()
}

/// Number of lock factories alive in this process
pub fn live_factories() -> usize {
    INSTANCES.live_count()
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
