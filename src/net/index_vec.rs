//! 稠密编号容器：库所、迁移与覆盖图节点都以 `u32` 编号顺序存放，
//! 通过 [`Idx`] 类型区分，避免把库所编号误用于迁移表。
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Dense id usable as a position in an [`IndexVec`].
pub trait Idx: Copy + Eq + Ord + fmt::Debug {
    fn index(self) -> usize;
    fn from_usize(idx: usize) -> Self;
}

/// `Vec<T>` addressed by `I` instead of `usize`. Read-only slice methods
/// (`len`, `iter`, `is_empty`, ...) come through `Deref`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexVec<I, T> {
    raw: Vec<T>,
    #[serde(skip)]
    _id: PhantomData<fn(I) -> I>,
}

impl<I: Idx, T> IndexVec<I, T> {
    pub fn new() -> Self {
        Vec::new().into()
    }

    pub fn from_elem(value: T, len: usize) -> Self
    where
        T: Clone,
    {
        vec![value; len].into()
    }

    /// Appends `value` and returns the id it was stored under.
    pub fn push(&mut self, value: T) -> I {
        self.raw.push(value);
        I::from_usize(self.raw.len() - 1)
    }

    pub fn get(&self, id: I) -> Option<&T> {
        self.raw.get(id.index())
    }

    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.raw.get_mut(id.index())
    }

    pub fn iter_enumerated(&self) -> impl Iterator<Item = (I, &T)> {
        self.raw
            .iter()
            .enumerate()
            .map(|(pos, value)| (I::from_usize(pos), value))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.raw
    }
}

impl<I: Idx, T> Default for IndexVec<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, T> Deref for IndexVec<I, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.raw
    }
}

impl<I, T: fmt::Debug> fmt::Debug for IndexVec<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw.fmt(f)
    }
}

impl<I: Idx, T> Index<I> for IndexVec<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.raw[id.index()]
    }
}

impl<I: Idx, T> IndexMut<I> for IndexVec<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.raw[id.index()]
    }
}

impl<I, T> From<Vec<T>> for IndexVec<I, T> {
    fn from(raw: Vec<T>) -> Self {
        Self {
            raw,
            _id: PhantomData,
        }
    }
}

impl<I, T> FromIterator<T> for IndexVec<I, T> {
    fn from_iter<It: IntoIterator<Item = T>>(iter: It) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::ids::{PlaceId, TransitionId};

    #[test]
    fn push_hands_out_consecutive_ids() {
        let mut names: IndexVec<TransitionId, &str> = IndexVec::new();
        assert_eq!(names.push("fork"), TransitionId::new(0));
        assert_eq!(names.push("join"), TransitionId::new(1));

        assert_eq!(names[TransitionId::new(1)], "join");
        assert_eq!(names.get(TransitionId::new(2)), None);
        assert_eq!(names.len(), 2);
        assert_eq!(
            names.iter_enumerated().map(|(id, _)| id).collect::<Vec<_>>(),
            vec![TransitionId::new(0), TransitionId::new(1)]
        );
    }

    #[test]
    fn serializes_as_a_plain_list() {
        let mut tokens: IndexVec<PlaceId, u64> = IndexVec::from_elem(0, 3);
        tokens[PlaceId::new(2)] = 4;

        let text = serde_json::to_string(&tokens).unwrap();
        assert_eq!(text, "[0,0,4]");
        let back: IndexVec<PlaceId, u64> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, tokens);
    }
}
