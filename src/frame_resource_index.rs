//! Frames-in-flight bookkeeping
//!
//! The CPU records frame N+1 while the GPU still works on frame N. Everything that the GPU may
//! still be reading therefore exists once per frame in flight, and a [`FrameResourceIndex`]
//! selects which copy belongs to the frame being recorded.

use std::ops::{Index, IndexMut};

/// Ring counter over `index_count` frame slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameResourceIndex {
    index: usize,
    index_count: usize,
}

impl FrameResourceIndex {
    /// Create a counter starting at slot 0.
    ///
    /// # Panics
    ///
    /// Panics if `index_count` is zero.
    pub fn new(index_count: usize) -> Self {
        assert!(index_count > 0, "FrameResourceIndex needs at least one slot");
        Self {
            index: 0,
            index_count,
        }
    }

    /// Advance to the next slot.
    pub fn step(&mut self) {
        self.index = self.next();
    }

    pub fn current(&self) -> usize {
        self.index
    }

    pub fn next(&self) -> usize {
        (self.index + 1) % self.index_count
    }

    pub fn previous(&self) -> usize {
        (self.index + self.index_count - 1) % self.index_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }
}

/// One `T` per frame in flight.
#[derive(Debug, Clone)]
pub struct FrameResources<T> {
    items: Vec<T>,
}

impl<T> FrameResources<T> {
    /// Build one item per slot of `index`.
    pub fn new(index: &FrameResourceIndex, mut create: impl FnMut(usize) -> T) -> Self {
        Self {
            items: (0..index.index_count()).map(&mut create).collect(),
        }
    }

    /// Like [`new`](Self::new), for constructors that can fail.
    pub fn try_new<E>(
        index: &FrameResourceIndex,
        create: impl FnMut(usize) -> Result<T, E>,
    ) -> Result<Self, E> {
        Ok(Self {
            items: (0..index.index_count())
                .map(create)
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn current(&self, index: &FrameResourceIndex) -> &T {
        &self.items[index.current()]
    }

    pub fn current_mut(&mut self, index: &FrameResourceIndex) -> &mut T {
        &mut self.items[index.current()]
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        self.items.get(slot)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }
}

impl<T> Index<usize> for FrameResources<T> {
    type Output = T;

    fn index(&self, slot: usize) -> &T {
        &self.items[slot]
    }
}

impl<T> IndexMut<usize> for FrameResources<T> {
    fn index_mut(&mut self, slot: usize) -> &mut T {
        &mut self.items[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_wraps_around() {
        let mut index = FrameResourceIndex::new(3);
        assert_eq!(index.current(), 0);
        assert_eq!(index.next(), 1);
        assert_eq!(index.previous(), 2);

        index.step();
        index.step();
        assert_eq!(index.current(), 2);
        assert_eq!(index.next(), 0);
        assert_eq!(index.previous(), 1);

        index.step();
        assert_eq!(index.current(), 0);
    }

    #[test]
    fn test_single_slot() {
        let mut index = FrameResourceIndex::new(1);
        index.step();
        assert_eq!(index.current(), 0);
        assert_eq!(index.next(), 0);
        assert_eq!(index.previous(), 0);
    }

    #[test]
    fn test_frame_resources_follow_index() {
        let mut index = FrameResourceIndex::new(2);
        let mut counters = FrameResources::new(&index, |slot| slot * 10);
        assert_eq!(*counters.current(&index), 0);

        index.step();
        *counters.current_mut(&index) += 1;
        assert_eq!(counters[1], 11);
        assert_eq!(counters.len(), 2);
    }

    #[test]
    fn test_try_new_propagates_errors() {
        let index = FrameResourceIndex::new(3);
        let result: Result<FrameResources<usize>, String> =
            FrameResources::try_new(&index, |slot| {
                if slot == 2 {
                    Err(format!("slot {slot}"))
                } else {
                    Ok(slot)
                }
            });
        assert_eq!(result.unwrap_err(), "slot 2");
    }
}
