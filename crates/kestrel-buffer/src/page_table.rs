//! Page table mapping (file, page number) to frame ID.

use crate::frame::FrameId;
use kestrel_common::{KestrelError, PageId, Result};

/// Minimum number of slots regardless of pool size.
const MIN_SLOTS: usize = 8;

#[derive(Debug, Clone, Copy)]
struct Slot {
    /// Packed PageId (upper 32 bits = file_id, lower 32 bits = page_num).
    key: u64,
    frame_id: FrameId,
}

/// Open-addressing hash table with linear probing.
///
/// Sized to at least 1.2x the frame count, rounded up to a power of two.
/// Removal shifts the rest of the probe run backwards instead of leaving
/// tombstones, so lookups of absent pages stay short under constant churn.
///
/// Not synchronized; the buffer manager owns it behind its state lock.
pub struct PageTable {
    slots: Box<[Option<Slot>]>,
    /// Bitmask for slot indexing (slots.len() - 1).
    mask: usize,
    len: usize,
}

impl PageTable {
    /// Creates a page table for a pool of `num_frames` frames.
    pub fn new(num_frames: usize) -> Self {
        let wanted = num_frames + num_frames / 5 + 1;
        let size = wanted.next_power_of_two().max(MIN_SLOTS);

        Self {
            slots: vec![None; size].into_boxed_slice(),
            mask: size - 1,
            len: 0,
        }
    }

    /// Computes the home slot for a key.
    #[inline(always)]
    fn home(&self, key: u64) -> usize {
        // FxHash-style multiply, high bits carry the most entropy
        let hash = key.wrapping_mul(0x517cc1b727220a95);
        ((hash >> 32) as usize ^ hash as usize) & self.mask
    }

    /// Returns the slot index holding `key`, if present.
    fn find(&self, key: u64) -> Option<usize> {
        let mut idx = self.home(key);
        for _ in 0..self.slots.len() {
            match self.slots[idx] {
                None => return None,
                Some(slot) if slot.key == key => return Some(idx),
                Some(_) => idx = (idx + 1) & self.mask,
            }
        }
        None
    }

    /// Looks up a page and returns its frame ID.
    ///
    /// `None` is the ordinary miss outcome, not an error.
    #[inline]
    pub fn get(&self, page_id: PageId) -> Option<FrameId> {
        self.find(page_id.as_u64())
            .and_then(|idx| self.slots[idx])
            .map(|slot| slot.frame_id)
    }

    /// Returns true if the page is in the table.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.get(page_id).is_some()
    }

    /// Records a mapping. Fails if the page is already mapped.
    pub fn insert(&mut self, page_id: PageId, frame_id: FrameId) -> Result<()> {
        let key = page_id.as_u64();
        let mut idx = self.home(key);

        for _ in 0..self.slots.len() {
            match self.slots[idx] {
                None => {
                    self.slots[idx] = Some(Slot { key, frame_id });
                    self.len += 1;
                    return Ok(());
                }
                Some(slot) if slot.key == key => {
                    return Err(KestrelError::HashAlreadyPresent {
                        page_id,
                        frame_id: slot.frame_id.0,
                    });
                }
                Some(_) => idx = (idx + 1) & self.mask,
            }
        }
        Err(KestrelError::PageTableFull)
    }

    /// Removes a mapping. Returns the frame ID if it was present.
    pub fn remove(&mut self, page_id: PageId) -> Option<FrameId> {
        let mut hole = self.find(page_id.as_u64())?;
        let removed = self.slots[hole].take()?;
        self.len -= 1;

        // Backward-shift: pull later members of the probe run into the hole
        // unless their home lies cyclically in (hole, idx].
        let mut idx = hole;
        for _ in 0..self.slots.len() {
            idx = (idx + 1) & self.mask;
            let Some(slot) = self.slots[idx] else {
                break;
            };
            let home = self.home(slot.key);
            let stays = if hole <= idx {
                hole < home && home <= idx
            } else {
                hole < home || home <= idx
            };
            if !stays {
                self.slots[hole] = self.slots[idx].take();
                hole = idx;
            }
        }

        Some(removed.frame_id)
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterates over all (page, frame) entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (PageId, FrameId)> + '_ {
        self.slots
            .iter()
            .flatten()
            .map(|slot| (PageId::from_u64(slot.key), slot.frame_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_common::FileId;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    fn pid(file: u32, page: u32) -> PageId {
        PageId::new(FileId(file), page)
    }

    #[test]
    fn test_sizing() {
        assert_eq!(PageTable::new(0).capacity(), MIN_SLOTS);
        assert_eq!(PageTable::new(3).capacity(), MIN_SLOTS);
        // 100 frames -> at least 121 slots -> 128
        assert_eq!(PageTable::new(100).capacity(), 128);
        assert!(PageTable::new(1000).capacity() >= 1200);
    }

    #[test]
    fn test_insert_get() {
        let mut table = PageTable::new(100);
        let page_id = pid(0, 42);

        table.insert(page_id, FrameId(7)).unwrap();
        assert_eq!(table.get(page_id), Some(FrameId(7)));
        assert!(table.contains(page_id));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let table = PageTable::new(10);
        assert_eq!(table.get(pid(1, 1)), None);
        assert!(!table.contains(pid(1, 1)));
    }

    #[test]
    fn test_same_page_num_different_files() {
        let mut table = PageTable::new(10);
        table.insert(pid(1, 5), FrameId(0)).unwrap();
        table.insert(pid(2, 5), FrameId(1)).unwrap();

        assert_eq!(table.get(pid(1, 5)), Some(FrameId(0)));
        assert_eq!(table.get(pid(2, 5)), Some(FrameId(1)));
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let mut table = PageTable::new(10);
        table.insert(pid(0, 1), FrameId(1)).unwrap();

        let err = table.insert(pid(0, 1), FrameId(2)).unwrap_err();
        assert!(matches!(
            err,
            KestrelError::HashAlreadyPresent { frame_id: 1, .. }
        ));
        assert_eq!(table.get(pid(0, 1)), Some(FrameId(1)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut table = PageTable::new(10);
        table.insert(pid(0, 1), FrameId(3)).unwrap();

        assert_eq!(table.remove(pid(0, 1)), Some(FrameId(3)));
        assert_eq!(table.get(pid(0, 1)), None);
        assert!(table.is_empty());
        assert_eq!(table.remove(pid(0, 1)), None);
    }

    #[test]
    fn test_full_table() {
        let mut table = PageTable::new(1);
        let capacity = table.capacity();
        for i in 0..capacity {
            table.insert(pid(0, i as u32), FrameId(i as u32)).unwrap();
        }

        let err = table.insert(pid(9, 9), FrameId(0)).unwrap_err();
        assert!(matches!(err, KestrelError::PageTableFull));

        // A full table still answers lookups and misses.
        assert_eq!(table.get(pid(0, 3)), Some(FrameId(3)));
        assert_eq!(table.get(pid(9, 9)), None);
    }

    #[test]
    fn test_removal_keeps_clustered_entries_reachable() {
        // Fill most of a small table so probe runs overlap, then delete
        // from the middle of the runs.
        let mut table = PageTable::new(1);
        let n = table.capacity() - 1;
        for i in 0..n {
            table.insert(pid(3, i as u32), FrameId(i as u32)).unwrap();
        }

        for i in (0..n).step_by(2) {
            assert_eq!(table.remove(pid(3, i as u32)), Some(FrameId(i as u32)));
        }

        for i in 0..n {
            let expected = if i % 2 == 0 { None } else { Some(FrameId(i as u32)) };
            assert_eq!(table.get(pid(3, i as u32)), expected, "page {}", i);
        }
        assert_eq!(table.len(), n / 2);
    }

    #[test]
    fn test_iter() {
        let mut table = PageTable::new(10);
        table.insert(pid(0, 1), FrameId(1)).unwrap();
        table.insert(pid(0, 2), FrameId(2)).unwrap();
        table.insert(pid(1, 1), FrameId(3)).unwrap();

        let mut entries: Vec<_> = table.iter().collect();
        entries.sort_by_key(|(_, frame_id)| *frame_id);
        assert_eq!(
            entries,
            vec![
                (pid(0, 1), FrameId(1)),
                (pid(0, 2), FrameId(2)),
                (pid(1, 1), FrameId(3)),
            ]
        );
    }

    #[test]
    fn test_matches_hashmap_under_churn() {
        let num_frames = 16;
        let mut table = PageTable::new(num_frames);
        let mut model: HashMap<PageId, FrameId> = HashMap::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);

        for step in 0..20_000u32 {
            let page_id = pid(rng.gen_range(0..3), rng.gen_range(0..40));
            if rng.gen_bool(0.5) && model.len() < num_frames {
                let frame_id = FrameId(step);
                let expected_dup = model.contains_key(&page_id);
                let result = table.insert(page_id, frame_id);
                assert_eq!(result.is_err(), expected_dup);
                model.entry(page_id).or_insert(frame_id);
            } else {
                assert_eq!(table.remove(page_id), model.remove(&page_id));
            }

            assert_eq!(table.len(), model.len());
        }

        for (page_id, frame_id) in &model {
            assert_eq!(table.get(*page_id), Some(*frame_id));
        }
        assert_eq!(table.iter().count(), model.len());
    }
}
