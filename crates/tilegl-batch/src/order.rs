//! Draw ordering of primitive records.
//!
//! Records are ordered back-to-front by [`SortKey`] and sorted in place with a
//! quicksort (midpoint pivot, three-way partition) that drops to heapsort when
//! recursion gets too deep. Every swap moves whole records through a single
//! scratch slot.

use core::cmp::Ordering;

use crate::record::{Record, TextureId, RECORD_SIZE};

/// Ordering key of one record.
///
/// Ordering rules (ascending = drawn earlier):
/// 1) `deleted`: live records first, deleted records always last
/// 2) `depth`: descending (further from the eye drawn first)
/// 3) `z_fighting`: descending
/// 4) `texture`: ascending (clusters same-texture records)
/// 5) `id`: ascending (total order; equal keys only for the same record)
#[derive(Debug, Copy, Clone)]
pub struct SortKey {
    pub deleted: bool,
    pub depth: f32,
    pub z_fighting: i32,
    pub texture: TextureId,
    pub id: u32,
}

impl SortKey {
    pub fn of<T: AsRef<[u8]>>(record: &Record<T>) -> Self {
        let id = record.id();
        Self {
            deleted: id == 0,
            depth: record.clip_depth(),
            z_fighting: record.z_fighting(),
            texture: record.texture(0),
            id,
        }
    }

    /// True if `self` must be drawn before `other`.
    #[inline]
    pub fn is_ordered_before(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Less
    }
}

impl Ord for SortKey {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.deleted
            .cmp(&other.deleted)
            .then_with(|| other.depth.total_cmp(&self.depth))
            .then_with(|| other.z_fighting.cmp(&self.z_fighting))
            .then_with(|| self.texture.cmp(&other.texture))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for SortKey {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

/// In-place sorter over a packed run of records.
pub(crate) struct RecordSorter<'a> {
    records: &'a mut [u8],
    scratch: &'a mut [u8],
    fallback: bool,
}

impl<'a> RecordSorter<'a> {
    /// `records` holds whole records; `scratch` is one spare record.
    pub(crate) fn new(records: &'a mut [u8], scratch: &'a mut [u8]) -> Self {
        debug_assert_eq!(records.len() % RECORD_SIZE, 0);
        debug_assert_eq!(scratch.len(), RECORD_SIZE);
        Self { records, scratch, fallback: false }
    }

    /// Sorts every record. Returns true if the heapsort fallback ran.
    pub(crate) fn sort(mut self) -> bool {
        let n = self.records.len() / RECORD_SIZE;
        if n > 1 {
            let depth_limit = 2 * (usize::BITS - 1 - n.leading_zeros());
            self.quicksort(0, n, depth_limit);
        }
        self.fallback
    }

    #[inline]
    fn key(&self, i: usize) -> SortKey {
        SortKey::of(&Record::new(&self.records[i * RECORD_SIZE..(i + 1) * RECORD_SIZE]))
    }

    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        let (ri, rj) = (i * RECORD_SIZE, j * RECORD_SIZE);
        self.scratch.copy_from_slice(&self.records[ri..ri + RECORD_SIZE]);
        self.records.copy_within(rj..rj + RECORD_SIZE, ri);
        self.records[rj..rj + RECORD_SIZE].copy_from_slice(&self.scratch[..]);
    }

    fn quicksort(&mut self, mut lo: usize, mut hi: usize, mut depth: u32) {
        while hi - lo > 1 {
            if depth == 0 {
                self.fallback = true;
                self.heapsort(lo, hi);
                return;
            }
            depth -= 1;

            let (lt, gt) = self.partition(lo, hi, lo + (hi - lo) / 2);

            // Recurse into the smaller side, loop on the larger one.
            if lt - lo < hi - gt {
                self.quicksort(lo, lt, depth);
                lo = gt;
            } else {
                self.quicksort(gt, hi, depth);
                hi = lt;
            }
        }
    }

    /// Three-way partition of `lo..hi` around the record at `pivot`.
    ///
    /// Returns `(lt, gt)`: `lo..lt` sorts before the pivot, `lt..gt` compares
    /// equal to it, `gt..hi` sorts after it.
    fn partition(&mut self, lo: usize, hi: usize, pivot: usize) -> (usize, usize) {
        let p = self.key(pivot);
        let (mut lt, mut i, mut gt) = (lo, lo, hi);
        while i < gt {
            match self.key(i).cmp(&p) {
                Ordering::Less => {
                    self.swap(lt, i);
                    lt += 1;
                    i += 1;
                }
                Ordering::Greater => {
                    gt -= 1;
                    self.swap(i, gt);
                }
                Ordering::Equal => i += 1,
            }
        }
        (lt, gt)
    }

    fn heapsort(&mut self, lo: usize, hi: usize) {
        let n = hi - lo;
        for root in (0..n / 2).rev() {
            self.sift_down(lo, root, n);
        }
        for end in (1..n).rev() {
            self.swap(lo, lo + end);
            self.sift_down(lo, 0, end);
        }
    }

    fn sift_down(&mut self, base: usize, mut root: usize, end: usize) {
        loop {
            let mut child = 2 * root + 1;
            if child >= end {
                break;
            }
            if child + 1 < end && self.key(base + child) < self.key(base + child + 1) {
                child += 1;
            }
            if self.key(base + root) >= self.key(base + child) {
                break;
            }
            self.swap(base + root, base + child);
            root = child;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: u32, depth: f32, z_fighting: i32, texture: u32) -> SortKey {
        SortKey { deleted: id == 0, depth, z_fighting, texture: TextureId(texture), id }
    }

    fn packed(keys: &[SortKey]) -> Vec<u8> {
        let mut bytes = vec![0u8; keys.len() * RECORD_SIZE];
        for (k, chunk) in keys.iter().zip(bytes.chunks_exact_mut(RECORD_SIZE)) {
            let mut rec = Record::new(chunk);
            rec.set_id(k.id);
            rec.set_clip_depth(k.depth);
            rec.set_z_fighting(k.z_fighting);
            rec.set_texture(0, k.texture);
        }
        bytes
    }

    fn keys_of(bytes: &[u8]) -> Vec<SortKey> {
        bytes.chunks_exact(RECORD_SIZE).map(|c| SortKey::of(&Record::new(c))).collect()
    }

    fn sort_packed(bytes: &mut [u8]) -> bool {
        let mut scratch = [0u8; RECORD_SIZE];
        RecordSorter::new(bytes, &mut scratch).sort()
    }

    /// Deterministic pseudo-random sequence (LCG).
    fn lcg(seed: &mut u32) -> u32 {
        *seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        *seed >> 8
    }

    // ── comparator ────────────────────────────────────────────────────────

    #[test]
    fn deleted_sorts_after_everything() {
        let dead = key(0, 100.0, 9, 0);
        let live = key(5, -100.0, -9, 9);
        assert!(live.is_ordered_before(&dead));
        assert!(!dead.is_ordered_before(&live));
    }

    #[test]
    fn deleted_records_never_order_before_each_other() {
        let a = key(0, 1.0, 0, 0);
        let b = key(0, 1.0, 0, 0);
        assert!(!a.is_ordered_before(&b));
        assert!(!b.is_ordered_before(&a));
    }

    #[test]
    fn further_depth_draws_first() {
        assert!(key(1, 5.0, 0, 0).is_ordered_before(&key(2, 3.0, 0, 0)));
        assert!(!key(2, 3.0, 0, 0).is_ordered_before(&key(1, 5.0, 0, 0)));
    }

    #[test]
    fn higher_z_fighting_draws_first_on_depth_tie() {
        assert!(key(3, 5.0, 1, 0).is_ordered_before(&key(1, 5.0, 0, 0)));
    }

    #[test]
    fn texture_breaks_remaining_ties() {
        assert!(key(9, 5.0, 1, 2).is_ordered_before(&key(1, 5.0, 1, 3)));
    }

    #[test]
    fn record_never_orders_before_itself() {
        let k = key(4, 1.0, 1, 1);
        assert!(!k.is_ordered_before(&k));
    }

    #[test]
    fn nan_depth_still_gives_total_order() {
        let a = key(1, f32::NAN, 0, 0);
        let b = key(2, 1.0, 0, 0);
        assert_ne!(a.is_ordered_before(&b), b.is_ordered_before(&a));
    }

    // ── sorter ────────────────────────────────────────────────────────────

    #[test]
    fn sorts_example_scenario() {
        let mut bytes = packed(&[key(1, 5.0, 0, 0), key(2, 3.0, 0, 0), key(3, 5.0, 1, 0)]);
        sort_packed(&mut bytes);
        let ids: Vec<u32> = keys_of(&bytes).iter().map(|k| k.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn swaps_move_whole_records() {
        let mut bytes = packed(&[key(1, 1.0, 0, 0), key(2, 2.0, 0, 0)]);
        Record::new(&mut bytes[..RECORD_SIZE]).set_position(2, [7.0, 8.0, 9.0]);
        sort_packed(&mut bytes);
        let second = Record::new(&bytes[RECORD_SIZE..]);
        assert_eq!(second.id(), 1);
        assert_eq!(second.position(2), [7.0, 8.0, 9.0]);
    }

    #[test]
    fn pseudo_random_input_ends_sorted() {
        let mut seed = 7;
        let keys: Vec<SortKey> = (1..=500)
            .map(|id| {
                let id = if lcg(&mut seed) % 5 == 0 { 0 } else { id };
                key(id, (lcg(&mut seed) % 8) as f32, (lcg(&mut seed) % 3) as i32, lcg(&mut seed) % 4)
            })
            .collect();
        let mut bytes = packed(&keys);
        sort_packed(&mut bytes);

        let sorted = keys_of(&bytes);
        assert_eq!(sorted.len(), keys.len());
        assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn many_equal_keys_stay_cheap() {
        // All records dead and identical: one partition pass groups them.
        let mut bytes = packed(&vec![key(0, 1.0, 0, 0); 2000]);
        assert!(!sort_packed(&mut bytes));
    }

    #[test]
    fn heapsort_fallback_sorts_range() {
        let mut seed = 99;
        let keys: Vec<SortKey> = (1..=64)
            .map(|id| key(id, (lcg(&mut seed) % 16) as f32, 0, lcg(&mut seed) % 3))
            .collect();
        let mut bytes = packed(&keys);
        let mut scratch = [0u8; RECORD_SIZE];
        let mut sorter = RecordSorter::new(&mut bytes, &mut scratch);
        sorter.quicksort(0, 64, 0);
        assert!(sorter.fallback);

        let sorted = keys_of(&bytes);
        assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
    }
}
