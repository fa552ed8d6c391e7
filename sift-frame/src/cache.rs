use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Instant;

use dashmap::{DashMap, Entry};
use sift_error::{SharedSiftResult, SiftError, SiftResult};
use sift_expr::ExprRef;
use sift_mask::Mask;

use crate::ViewId;

const DEFAULT_PRUNE_THRESHOLD: usize = 1024;

/// Settings for a [`MaskCache`].
#[derive(Debug, Clone)]
pub struct MaskCacheOptions {
    prune_threshold: usize,
}

impl Default for MaskCacheOptions {
    fn default() -> Self {
        Self {
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
        }
    }
}

impl MaskCacheOptions {
    /// Sweep dead entries out of the cache whenever it holds more than `threshold` keys.
    ///
    /// Entries normally remove themselves when their last view is dropped; the sweep only
    /// catches entries whose removal raced with a replacement.
    pub fn with_prune_threshold(mut self, threshold: usize) -> Self {
        self.prune_threshold = threshold;
        self
    }
}

/// A point-in-time summary of a [`MaskCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskCacheStats {
    /// Keys currently held alive by at least one view.
    pub entries: usize,
    /// Selections computed since the cache was created.
    pub computations: usize,
}

/// Identity of a selection: the view the filter runs over, and the filter itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MaskKey {
    parent: ViewId,
    filter: ExprRef,
}

impl Display for MaskKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.parent, self.filter)
    }
}

/// Memoizes selection masks per (parent view, filter).
///
/// The map only holds weak references. Each filtered view owns its [`SelectionCell`], so a mask
/// lives exactly as long as some view that uses it. The map is locked only to find or create the
/// cell for a key; the mask itself is computed through the cell.
#[derive(Default)]
pub struct MaskCache {
    cells: DashMap<MaskKey, Weak<SelectionCell>>,
    options: MaskCacheOptions,
    computations: AtomicUsize,
}

impl MaskCache {
    pub fn new(options: MaskCacheOptions) -> Self {
        Self {
            cells: DashMap::default(),
            options,
            computations: AtomicUsize::new(0),
        }
    }

    pub fn stats(&self) -> MaskCacheStats {
        MaskCacheStats {
            entries: self
                .cells
                .iter()
                .filter(|entry| entry.value().strong_count() > 0)
                .count(),
            computations: self.computations.load(Ordering::Relaxed),
        }
    }

    /// Find the live cell for a key, or register a new one.
    pub(crate) fn claim(self: &Arc<Self>, parent: ViewId, filter: ExprRef) -> Arc<SelectionCell> {
        let key = MaskKey { parent, filter };

        // No cell may be dropped while a shard is locked, since dropping a cell removes its own
        // entry from the map.
        let cell = match self.cells.entry(key.clone()) {
            Entry::Occupied(mut e) => match e.get().upgrade() {
                Some(cell) => {
                    log::trace!("Reusing selection {key}");
                    cell
                }
                None => {
                    let cell = Arc::new(SelectionCell::new(key, Arc::downgrade(self)));
                    e.insert(Arc::downgrade(&cell));
                    cell
                }
            },
            Entry::Vacant(e) => {
                let cell = Arc::new(SelectionCell::new(key, Arc::downgrade(self)));
                e.insert(Arc::downgrade(&cell));
                cell
            }
        };

        if self.cells.len() > self.options.prune_threshold {
            self.prune();
        }

        cell
    }

    fn prune(&self) {
        let before = self.cells.len();
        self.cells.retain(|_, cell| cell.strong_count() > 0);
        log::trace!(
            "Pruned {} dead selections",
            before.saturating_sub(self.cells.len())
        );
    }

    fn evict(&self, key: &MaskKey) {
        if self
            .cells
            .remove_if(key, |_, cell| cell.strong_count() == 0)
            .is_some()
        {
            log::trace!("Evicted selection {key}");
        }
    }
}

/// The shared, lazily computed selection for one key.
///
/// The first caller of [`SelectionCell::get_or_compute`] computes the mask; concurrent callers
/// block until it is published and then observe the same result, including a failure.
pub(crate) struct SelectionCell {
    key: MaskKey,
    cache: Weak<MaskCache>,
    mask: OnceLock<SharedSiftResult<Mask>>,
}

impl SelectionCell {
    fn new(key: MaskKey, cache: Weak<MaskCache>) -> Self {
        Self {
            key,
            cache,
            mask: OnceLock::new(),
        }
    }

    pub(crate) fn get_or_compute(
        &self,
        compute: impl FnOnce() -> SiftResult<Mask>,
    ) -> SiftResult<Mask> {
        self.mask
            .get_or_init(|| {
                if let Some(cache) = self.cache.upgrade() {
                    cache.computations.fetch_add(1, Ordering::Relaxed);
                }

                let start = Instant::now();
                let result = compute().map_err(Arc::new);
                match &result {
                    Ok(mask) => log::debug!(
                        "Computed selection {}: {} of {} rows in {}us",
                        self.key,
                        mask.true_count(),
                        mask.len(),
                        start.elapsed().as_micros()
                    ),
                    Err(err) => log::debug!("Selection {} failed: {err}", self.key),
                }
                result
            })
            .clone()
            .map_err(SiftError::from)
    }
}

impl Drop for SelectionCell {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.upgrade() {
            cache.evict(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use sift_error::sift_err;
    use sift_expr::{col, lit, lt};

    use super::*;

    fn filter() -> ExprRef {
        lt(col("x"), lit(5))
    }

    #[test]
    fn same_key_shares_a_cell() {
        let cache = Arc::new(MaskCache::default());
        let id = ViewId::next();

        let a = cache.claim(id, filter());
        let b = cache.claim(id, filter());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats().entries, 1);

        let other = cache.claim(ViewId::next(), filter());
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(cache.stats().entries, 2);
    }

    #[test]
    fn dropping_the_last_holder_evicts() {
        let cache = Arc::new(MaskCache::default());
        let id = ViewId::next();

        let a = cache.claim(id, filter());
        let b = cache.claim(id, filter());
        drop(a);
        assert_eq!(cache.stats().entries, 1);
        drop(b);
        assert_eq!(cache.stats(), MaskCacheStats::default());
        assert!(cache.cells.is_empty());
    }

    #[test]
    fn computes_once_and_shares_failures() {
        let cache = Arc::new(MaskCache::default());
        let cell = cache.claim(ViewId::next(), filter());

        let err = cell
            .get_or_compute(|| Err(sift_err!(FilterEvaluation: "boom")))
            .unwrap_err();
        assert!(err.is_filter_evaluation());

        let again = cell.get_or_compute(|| Ok(Mask::new_true(3))).unwrap_err();
        assert!(again.is_filter_evaluation());
        assert_eq!(cache.stats().computations, 1);
    }

    #[test]
    fn concurrent_callers_block_on_one_computation() {
        let cache = Arc::new(MaskCache::default());
        let id = ViewId::next();
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles = (0..threads)
            .map(|_| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let cell = cache.claim(id, filter());
                    barrier.wait();
                    cell.get_or_compute(|| Ok(Mask::from_iter([true, false, true])))
                        .unwrap()
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            assert_eq!(handle.join().unwrap().true_count(), 2);
        }
        assert_eq!(cache.stats().computations, 1);
    }

    #[test]
    fn prune_sweeps_dead_entries() {
        let cache = Arc::new(MaskCache::new(
            MaskCacheOptions::default().with_prune_threshold(2),
        ));
        let kept = cache.claim(ViewId::next(), filter());

        cache
            .cells
            .insert(MaskKey { parent: ViewId::next(), filter: filter() }, Weak::new());
        cache
            .cells
            .insert(MaskKey { parent: ViewId::next(), filter: filter() }, Weak::new());
        assert_eq!(cache.cells.len(), 3);

        let other = cache.claim(ViewId::next(), filter());
        assert_eq!(cache.cells.len(), 2);
        assert_eq!(cache.stats().entries, 2);
        drop((kept, other));
    }
}
