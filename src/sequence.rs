//! List values wrapped for configuration-aware access.

use std::fmt;
use std::sync::Arc;

use crate::config::{self, Item, Missing};
use crate::error::ConfitError;
use crate::value::{Map, Value};

/// A sequence node as handed to callers: element order is preserved, mapping
/// elements come back as sub-configurations (carrying the owning tree and
/// missing policy), and string elements are reference-resolved on access.
///
/// The backing list is shared, never copied, and nothing here can mutate it.
#[derive(Clone)]
pub struct ConfigurationSequence {
    root: Arc<Map>,
    items: Arc<Vec<Value>>,
    missing: Missing,
}

impl ConfigurationSequence {
    pub(crate) fn new(root: Arc<Map>, items: Arc<Vec<Value>>, missing: Missing) -> Self {
        ConfigurationSequence {
            root,
            items,
            missing,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element at `index`, wrapped and resolved. An index past the end
    /// follows the missing policy, like an absent key.
    pub fn get(&self, index: usize) -> Result<Item, ConfitError> {
        match self.items.get(index) {
            Some(value) => config::wrap(&self.root, self.missing, value),
            None => match self.missing {
                Missing::Silent => Ok(Item::NotConfigured),
                Missing::Error => Err(ConfitError::NotConfigured {
                    key: format!("[{index}]"),
                }),
            },
        }
    }

    /// Iterate the wrapped, resolved elements in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Item, ConfitError>> + '_ {
        self.items
            .iter()
            .map(|value| config::wrap(&self.root, self.missing, value))
    }

    /// Raw snapshot of the backing list, references left verbatim.
    pub fn to_vec(&self) -> Vec<Value> {
        (*self.items).clone()
    }
}

impl PartialEq for ConfigurationSequence {
    fn eq(&self, other: &ConfigurationSequence) -> bool {
        self.items == other.items
    }
}

impl Eq for ConfigurationSequence {}

impl fmt::Debug for ConfigurationSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}
