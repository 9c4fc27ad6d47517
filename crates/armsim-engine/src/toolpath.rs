//! [`Toolpath`] – the append-only trace of effector positions.
//!
//! Points are stored in fixed-size chunks. Full chunks are sealed behind an
//! `Arc` and never change again, so cloning a toolpath for a snapshot copies
//! at most one partial chunk plus a reference count, however long the trace
//! has grown.

use std::sync::Arc;

use armsim_types::Point2;
use serde::{Serialize, Serializer};

/// Points per sealed chunk.
const CHUNK_LEN: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct Toolpath {
    sealed: Arc<Vec<Arc<[Point2]>>>,
    tail: Vec<Point2>,
    len: usize,
}

impl Toolpath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: Point2) {
        self.tail.push(point);
        self.len += 1;
        if self.tail.len() == CHUNK_LEN {
            let chunk: Arc<[Point2]> = std::mem::take(&mut self.tail).into();
            Arc::make_mut(&mut self.sealed).push(chunk);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last(&self) -> Option<Point2> {
        self.tail
            .last()
            .or_else(|| self.sealed.last().and_then(|c| c.last()))
            .copied()
    }

    /// Points in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &Point2> {
        self.sealed
            .iter()
            .flat_map(|chunk| chunk.iter())
            .chain(self.tail.iter())
    }

    pub fn to_vec(&self) -> Vec<Point2> {
        self.iter().copied().collect()
    }

    /// Whether `self` and `other` share their sealed chunks.
    pub fn shares_storage_with(&self, other: &Toolpath) -> bool {
        Arc::ptr_eq(&self.sealed, &other.sealed)
    }
}

impl PartialEq for Toolpath {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<'a> IntoIterator for &'a Toolpath {
    type Item = &'a Point2;
    type IntoIter = Box<dyn Iterator<Item = &'a Point2> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl Serialize for Toolpath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
