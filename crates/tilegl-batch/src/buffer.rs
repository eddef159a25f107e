use std::collections::HashMap;
use std::fmt;

use crate::order::RecordSorter;
use crate::quad::{Quad, QuadId};
use crate::record::{MaterialTag, Record, TextureId, RECORD_SIZE, VERTICES_PER_RECORD};
use crate::triangle::{Triangle, TriangleMut, TriangleRef};
use crate::{BatchError, IdCounter, PrimitiveId};

/// Default growth step of the backing store, in bytes.
pub const DEFAULT_GROW_INCREMENT: usize = 65536;

/// Most records a buffer holds, so every vertex index fits a `u32` draw range.
pub const MAX_RECORDS: usize = (u32::MAX as usize) / VERTICES_PER_RECORD;

/// Batch buffer sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Bytes reserved up front (excluding the scratch record). May be 0.
    pub initial_capacity: usize,
    /// Bytes added each time the store is full. At least one record.
    pub grow_increment: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_GROW_INCREMENT,
            grow_increment: DEFAULT_GROW_INCREMENT,
        }
    }
}

/// A maximal run of consecutive live records sharing one texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawRun {
    pub texture: TextureId,
    /// Index of the first record of the run.
    pub first_record: usize,
    /// Number of records in the run.
    pub records: usize,
}

impl DrawRun {
    #[inline]
    pub fn byte_offset(&self) -> usize {
        self.first_record * RECORD_SIZE
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.records * RECORD_SIZE
    }

    /// Saturates at `u32::MAX`; runs from a [`BatchBuffer`] never exceed [`MAX_RECORDS`].
    #[inline]
    pub fn first_vertex(&self) -> u32 {
        vertex_index(self.first_record)
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        vertex_index(self.records)
    }
}

fn vertex_index(records: usize) -> u32 {
    records
        .checked_mul(VERTICES_PER_RECORD)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(u32::MAX)
}

/// Outcome of one sort pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct SortStats {
    /// Live records left after the pass.
    pub live: usize,
    /// Deleted records whose storage was reclaimed.
    pub reclaimed: usize,
    /// The heapsort fallback ran on at least one range.
    pub fallback: bool,
}

/// Growable, densely packed store of triangle records.
///
/// Layout of the backing bytes:
/// - `0..used`: records in draw order (after a sort) or allocation order (before)
/// - `used..capacity`: free space
/// - `capacity..capacity + RECORD_SIZE`: scratch record used by swaps
///
/// Performance characteristics:
/// - allocation is amortized O(1); growth preserves every existing byte offset
/// - `purge` is O(1); storage is reclaimed by the next `sort`
/// - `sort` is O(n log n), in place
///
/// Handles returned by this type borrow it, so they cannot survive a sort or a
/// growth step. Keep the [`PrimitiveId`] (or [`QuadId`]) and look it up again.
pub struct BatchBuffer {
    data: Vec<u8>,
    capacity: usize,
    used: usize,
    count: usize,
    grow_increment: usize,
    ids: IdCounter,
    index: HashMap<PrimitiveId, usize>,
    dirty: bool,
}

impl BatchBuffer {
    pub fn new(config: BatchConfig) -> Result<Self, BatchError> {
        Self::with_id_counter(config, IdCounter::new())
    }

    /// Builds a buffer issuing identifiers from `ids`.
    pub fn with_id_counter(config: BatchConfig, ids: IdCounter) -> Result<Self, BatchError> {
        if config.grow_increment < RECORD_SIZE {
            return Err(BatchError::InvalidConfig("grow_increment is smaller than one record"));
        }

        let total = config
            .initial_capacity
            .checked_add(RECORD_SIZE)
            .ok_or(BatchError::AllocationFailed { requested_bytes: usize::MAX })?;
        let mut data = Vec::new();
        data.try_reserve_exact(total)
            .map_err(|_| BatchError::AllocationFailed { requested_bytes: total })?;
        data.resize(total, 0);

        Ok(Self {
            data,
            capacity: config.initial_capacity,
            used: 0,
            count: 0,
            grow_increment: config.grow_increment,
            ids,
            index: HashMap::new(),
            dirty: false,
        })
    }

    /// Number of records, live or purged-but-not-yet-reclaimed.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Usable bytes, excluding the scratch record.
    #[inline]
    pub fn capacity_bytes(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    /// True if records were added or handed out mutably since the last sort.
    #[inline]
    pub fn needs_sort(&self) -> bool {
        self.dirty
    }

    /// The identifier counter; lets a host continue the sequence in another buffer.
    #[inline]
    pub fn id_counter(&self) -> &IdCounter {
        &self.ids
    }

    /// Record bytes in buffer order, ready for upload as a vertex buffer.
    #[inline]
    pub fn live_bytes(&self) -> &[u8] {
        &self.data[..self.used]
    }

    /// Iterates records in buffer order, purged ones included.
    pub fn iter(&self) -> impl Iterator<Item = TriangleRef<'_>> {
        self.data[..self.used].chunks_exact(RECORD_SIZE).map(Triangle::bind)
    }

    /// Read-only handle to the record at `index`.
    pub fn get(&self, index: usize) -> Option<TriangleRef<'_>> {
        (index < self.count).then(|| Triangle::bind(self.slot(index)))
    }

    /// Appends a new triangle, growing the store first if it is full.
    pub fn allocate_triangle(&mut self, material: MaterialTag) -> Result<TriangleMut<'_>, BatchError> {
        let index = self.push_record(material)?;
        Ok(Triangle::bind(self.slot_mut(index)))
    }

    /// Appends two triangles and joins them into a quad.
    pub fn allocate_quad(&mut self, material: MaterialTag) -> Result<Quad<'_>, BatchError> {
        let first = self.push_record(material)?;
        let second = match self.push_record(material) {
            Ok(i) => i,
            Err(err) => {
                Triangle::bind(self.slot_mut(first)).purge();
                return Err(err);
            }
        };
        let (a, b) = self.pair_mut(first, second);
        Quad::new(a, b)
    }

    /// Resolves `id` to its current record.
    ///
    /// Returns `None` for purged ids and ids this buffer never issued.
    pub fn lookup(&self, id: PrimitiveId) -> Option<TriangleRef<'_>> {
        let index = self.live_index(id)?;
        Some(Triangle::bind(self.slot(index)))
    }

    pub fn lookup_mut(&mut self, id: PrimitiveId) -> Option<TriangleMut<'_>> {
        let index = self.live_index(id)?;
        self.dirty = true;
        Some(Triangle::bind(self.slot_mut(index)))
    }

    /// Reacquires a quad from its id. `None` if either half is gone.
    pub fn quad_mut(&mut self, id: QuadId) -> Option<Quad<'_>> {
        let first = self.live_index(id.first)?;
        let second = self.live_index(id.second)?;
        if first == second {
            return None;
        }
        self.dirty = true;
        let (a, b) = self.pair_mut(first, second);
        Quad::new(a, b).ok()
    }

    /// Purges the triangle with `id`. Returns false if it was not live.
    pub fn purge(&mut self, id: PrimitiveId) -> bool {
        match self.lookup_mut(id) {
            Some(mut t) => {
                t.purge();
                true
            }
            None => false,
        }
    }

    /// Purges both halves of a quad. Returns false if neither was live.
    pub fn purge_quad(&mut self, id: QuadId) -> bool {
        let first = self.purge(id.first);
        let second = self.purge(id.second);
        first || second
    }

    /// Drops every record, keeping the allocated storage.
    pub fn clear(&mut self) {
        self.used = 0;
        self.count = 0;
        self.index.clear();
        self.dirty = false;
    }

    /// Sorts records into draw order and reclaims purged ones.
    ///
    /// Afterwards every live record precedes every purged one, the purged
    /// tail is trimmed off, and the id index points at the new positions.
    pub fn sort(&mut self) -> SortStats {
        let scratch_at = self.capacity;
        let (head, tail) = self.data.split_at_mut(scratch_at);
        let records = &mut head[..self.used];
        let scratch = &mut tail[..RECORD_SIZE];
        let fallback = RecordSorter::new(records, scratch).sort();

        let live = (0..self.count).take_while(|&i| Record::new(self.slot(i)).id() != 0).count();
        debug_assert!(
            (live..self.count).all(|i| Record::new(self.slot(i)).id() == 0),
            "live record found after the purged tail"
        );

        let stats = SortStats { live, reclaimed: self.count - live, fallback };
        self.count = live;
        self.used = live * RECORD_SIZE;
        self.rebuild_index();
        self.dirty = false;

        log::debug!(
            "batch sorted: {} live, {} reclaimed{}",
            stats.live,
            stats.reclaimed,
            if stats.fallback { " (heapsort fallback)" } else { "" }
        );
        stats
    }

    /// Calls `draw` once per maximal run of live records sharing a texture,
    /// in buffer order. Purged records end a run and are skipped.
    ///
    /// Returns the number of runs.
    pub fn render<F>(&self, mut draw: F) -> usize
    where
        F: FnMut(DrawRun),
    {
        let mut runs = 0;
        let mut current: Option<DrawRun> = None;

        for i in 0..self.count {
            let record = Record::new(self.slot(i));
            if record.id() == 0 {
                if let Some(run) = current.take() {
                    draw(run);
                    runs += 1;
                }
                continue;
            }

            let texture = record.texture(0);
            match current.as_mut() {
                Some(run) if run.texture == texture => run.records += 1,
                _ => {
                    let next = DrawRun { texture, first_record: i, records: 1 };
                    if let Some(run) = current.replace(next) {
                        draw(run);
                        runs += 1;
                    }
                }
            }
        }

        if let Some(run) = current {
            draw(run);
            runs += 1;
        }
        log::trace!("batch rendered in {runs} runs");
        runs
    }

    // ── internals ─────────────────────────────────────────────────────────

    #[inline]
    fn slot(&self, index: usize) -> &[u8] {
        &self.data[index * RECORD_SIZE..(index + 1) * RECORD_SIZE]
    }

    #[inline]
    fn slot_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.data[index * RECORD_SIZE..(index + 1) * RECORD_SIZE]
    }

    /// Mutable handles to two distinct records, in argument order.
    fn pair_mut(&mut self, first: usize, second: usize) -> (TriangleMut<'_>, TriangleMut<'_>) {
        debug_assert_ne!(first, second);
        let (lo, hi) = (first.min(second), first.max(second));
        let (left, right) = self.data.split_at_mut(hi * RECORD_SIZE);
        let lo_slot = &mut left[lo * RECORD_SIZE..(lo + 1) * RECORD_SIZE];
        let hi_slot = &mut right[..RECORD_SIZE];
        if first < second {
            (Triangle::bind(lo_slot), Triangle::bind(hi_slot))
        } else {
            (Triangle::bind(hi_slot), Triangle::bind(lo_slot))
        }
    }

    fn live_index(&self, id: PrimitiveId) -> Option<usize> {
        let &index = self.index.get(&id)?;
        (index < self.count && Record::new(self.slot(index)).id() == id.get()).then_some(index)
    }

    fn push_record(&mut self, material: MaterialTag) -> Result<usize, BatchError> {
        if self.count >= MAX_RECORDS {
            log::error!("batch buffer holds the maximum of {MAX_RECORDS} records");
            return Err(BatchError::AllocationFailed { requested_bytes: RECORD_SIZE });
        }
        if self.used + RECORD_SIZE > self.capacity {
            self.grow()?;
        }

        let index = self.count;
        let offset = self.used;
        let triangle = Triangle::create(
            &mut self.data[offset..offset + RECORD_SIZE],
            material,
            &mut self.ids,
        )
        .inspect_err(|err| log::error!("triangle allocation failed: {err}"))?;

        if let Some(id) = triangle.id() {
            self.index.insert(id, index);
        }
        self.used += RECORD_SIZE;
        self.count += 1;
        self.dirty = true;
        Ok(index)
    }

    fn grow(&mut self) -> Result<(), BatchError> {
        let increment = self.grow_increment;
        let failed = BatchError::AllocationFailed { requested_bytes: increment };

        let Some(new_capacity) = self.capacity.checked_add(increment) else {
            log::error!("batch buffer capacity overflow");
            return Err(failed);
        };
        if self.data.try_reserve_exact(increment).is_err() {
            log::error!("batch buffer could not grow to {new_capacity} bytes");
            return Err(failed);
        }
        // Existing records keep their offsets; the old scratch bytes become free space.
        self.data.resize(new_capacity + RECORD_SIZE, 0);

        log::debug!("batch buffer grown: {} -> {} bytes", self.capacity, new_capacity);
        self.capacity = new_capacity;
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for i in 0..self.count {
            if let Some(id) = PrimitiveId::new(Record::new(self.slot(i)).id()) {
                self.index.insert(id, i);
            }
        }
    }
}

impl fmt::Debug for BatchBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchBuffer")
            .field("capacity", &self.capacity)
            .field("used", &self.used)
            .field("count", &self.count)
            .field("grow_increment", &self.grow_increment)
            .field("last_id", &self.ids.last())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}
