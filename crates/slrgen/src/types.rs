//! Utility types.

use bit_set::BitSet;

use crate::grammar::TerminalID;

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;

/// A set of terminal symbols, backed by a bit set over the raw terminal ids.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw().into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw().into())
    }
    /// Merge the elements of `other` and report whether this set grew.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let before = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != before
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner.iter().map(|raw| {
            let raw = u16::try_from(raw).expect("terminal id out of range");
            TerminalID::from_raw(raw)
        })
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}
