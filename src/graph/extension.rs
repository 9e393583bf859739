//! 可扩展属性表：附着在图、节点与边上的具名键值对，每一项带有复制/持久化策略.
use std::any::Any;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Controls how an extension entry propagates when its owner is cloned and
/// whether renderers should write it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtensionPolicy {
    Copy,
    NoCopy,
    Persist,
    PersistOnly,
}

impl ExtensionPolicy {
    pub fn copies(self) -> bool {
        matches!(self, Self::Copy | Self::Persist)
    }

    pub fn persists(self) -> bool {
        matches!(self, Self::Persist | Self::PersistOnly)
    }
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        Self::Copy
    }
}

/// Any value that can live in an [`Extensions`] table.
pub trait ExtensionValue: Any + fmt::Debug + Send + Sync {
    fn clone_value(&self) -> Box<dyn ExtensionValue>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> ExtensionValue for T
where
    T: Any + Clone + fmt::Debug + Send + Sync,
{
    fn clone_value(&self) -> Box<dyn ExtensionValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct Entry {
    value: Box<dyn ExtensionValue>,
    policy: ExtensionPolicy,
}

#[derive(Default)]
pub struct Extensions {
    entries: IndexMap<String, Entry>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores `value` under `key`, replacing any previous entry and its policy.
    pub fn put<T>(&mut self, key: impl Into<String>, value: T, policy: ExtensionPolicy)
    where
        T: ExtensionValue,
    {
        self.entries.insert(
            key.into(),
            Entry {
                value: Box::new(value),
                policy,
            },
        );
    }

    /// Returns the value under `key` if it exists and has type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries
            .get(key)
            .and_then(|entry| entry.value.as_ref().as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.entries
            .get_mut(key)
            .and_then(|entry| entry.value.as_mut().as_any_mut().downcast_mut::<T>())
    }

    pub fn get_dyn(&self, key: &str) -> Option<&dyn ExtensionValue> {
        self.entries.get(key).map(|entry| entry.value.as_ref())
    }

    pub fn policy(&self, key: &str) -> Option<ExtensionPolicy> {
        self.entries.get(key).map(|entry| entry.policy)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries a renderer should write alongside the owning entity.
    pub fn persistent(&self) -> impl Iterator<Item = (&str, &dyn ExtensionValue)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.policy.persists())
            .map(|(key, entry)| (key.as_str(), entry.value.as_ref()))
    }

    /// Copies the entries whose policy allows it; `NoCopy` and `PersistOnly`
    /// entries stay behind.
    pub fn clone_with_policy(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.policy.copies())
            .map(|(key, entry)| {
                (
                    key.clone(),
                    Entry {
                        value: entry.value.clone_value(),
                        policy: entry.policy,
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

impl Clone for Extensions {
    fn clone(&self) -> Self {
        self.clone_with_policy()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, entry) in &self.entries {
            map.entry(key, &(entry.policy, &entry.value));
        }
        map.finish()
    }
}

/// Capability of carrying an extension table.
pub trait Extensible {
    fn extensions(&self) -> &Extensions;
    fn extensions_mut(&mut self) -> &mut Extensions;

    fn put_extension<T>(&mut self, key: impl Into<String>, value: T, policy: ExtensionPolicy)
    where
        T: ExtensionValue,
        Self: Sized,
    {
        self.extensions_mut().put(key, value, policy);
    }

    fn extension<T: Any>(&self, key: &str) -> Option<&T>
    where
        Self: Sized,
    {
        self.extensions().get(key)
    }
}
