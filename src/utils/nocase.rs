//! Case-insensitive string lookup
//!
//! Element names in shape files and emote codes in model configs are matched
//! ignoring ASCII case. Keys are folded once on insert so lookups cost one
//! lowercase allocation at most.

use rustc_hash::FxHashMap;

/// A `String -> V` map whose keys compare ASCII-case-insensitively.
#[derive(Debug, Clone)]
pub struct CaseInsensitiveMap<V> {
    inner: FxHashMap<String, V>,
}

impl<V> CaseInsensitiveMap<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    #[inline]
    fn fold(key: &str) -> std::borrow::Cow<'_, str> {
        if key.bytes().any(|b| b.is_ascii_uppercase()) {
            std::borrow::Cow::Owned(key.to_ascii_lowercase())
        } else {
            std::borrow::Cow::Borrowed(key)
        }
    }

    /// Inserts, replacing any value whose key differs only in case.
    pub fn insert(&mut self, key: &str, value: V) -> Option<V> {
        self.inner.insert(Self::fold(key).into_owned(), value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.inner.get(Self::fold(key).as_ref())
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.inner.get_mut(Self::fold(key).as_ref())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(Self::fold(key).as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values()
    }
}

impl<V> Default for CaseInsensitiveMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
