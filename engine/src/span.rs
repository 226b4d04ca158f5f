//! Fitted lists and multi-volume spanning.
//!
//! A span splits an item table into consecutive volumes of equal capacity:
//! fit the table, remove the chosen items, fit the remainder onto a fresh
//! volume, and so on until nothing is left.

use serde::Serialize;

use crate::error::EngineError;
use crate::fit::FitAlgorithm;
use crate::model::{ItemKey, ItemTable};
use crate::progress::SpanProgress;

/// One volume of a span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanItem<K> {
    /// Items placed on this volume, in selection order
    pub items: Vec<K>,
    /// Bytes used by those items
    pub size: u64,
    /// Capacity of the volume
    pub capacity: u64,
    /// Utilization as a percentage (0-100)
    pub utilization: f64,
}

/// The items from `table` that fit in `capacity`.
pub fn generate_fitted<K: ItemKey>(
    table: &ItemTable<K>,
    capacity: u64,
    algorithm: FitAlgorithm,
) -> Vec<K> {
    algorithm.fit(table, capacity).items
}

/// Lower bound on the number of volumes needed for `total` bytes.
pub fn minimum_volumes(total: u64, capacity: u64) -> u64 {
    if capacity == 0 {
        return 0;
    }
    total.div_ceil(capacity)
}

/// Split `table` across as many volumes of `capacity` as it takes.
///
/// Every item lands on exactly one volume. An empty table yields no volumes.
///
/// # Errors
/// - `InvalidCapacity` if capacity is zero and there is anything to place
/// - `ItemTooLarge` if any single item is bigger than a volume
/// - `SpanStalled` if a pass places nothing (cannot happen once the checks
///   above pass, but the loop refuses to spin)
pub fn generate_span<K: ItemKey>(
    table: &ItemTable<K>,
    capacity: u64,
    algorithm: FitAlgorithm,
    progress: Option<&dyn SpanProgress<K>>,
) -> Result<Vec<SpanItem<K>>, EngineError> {
    if capacity == 0 && !table.is_empty() {
        return Err(EngineError::InvalidCapacity {
            reason: "cannot span items across zero-capacity volumes".to_string(),
        });
    }
    if let Some(item) = table.iter().find(|item| item.size > capacity) {
        return Err(EngineError::ItemTooLarge {
            item: format!("{:?}", item.id),
            size: item.size,
            capacity,
        });
    }

    if let Some(callback) = progress {
        callback.on_span_started(table, capacity);
    }

    let mut remaining = table.clone();
    let mut volumes = Vec::new();
    let mut iteration = 0;

    while !remaining.is_empty() {
        iteration += 1;
        let fit = algorithm.fit(&remaining, capacity);
        if fit.is_empty() {
            return Err(EngineError::SpanStalled { iteration });
        }
        remaining.remove_all(&fit.items);

        let volume = SpanItem {
            utilization: fit.utilization(capacity),
            size: fit.used,
            capacity,
            items: fit.items,
        };
        tracing::info!(
            volume = iteration,
            items = volume.items.len(),
            bytes = volume.size,
            utilization = volume.utilization,
            left = remaining.len(),
            "volume planned"
        );
        if let Some(callback) = progress {
            callback.on_volume_planned(volumes.len(), &volume);
        }
        volumes.push(volume);
    }

    if let Some(callback) = progress {
        callback.on_span_completed(&volumes);
    }

    Ok(volumes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn table(items: &[(&'static str, u64)]) -> ItemTable<&'static str> {
        items.iter().copied().collect()
    }

    struct RecordingProgress {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingProgress {
        fn new() -> Self {
            RecordingProgress {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn get_calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SpanProgress<&'static str> for RecordingProgress {
        fn on_span_started(&self, items: &ItemTable<&'static str>, capacity: u64) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("started({}, {})", items.len(), capacity));
        }

        fn on_volume_planned(&self, volume_index: usize, volume: &SpanItem<&'static str>) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("volume({}, {})", volume_index, volume.size));
        }

        fn on_span_completed(&self, volumes: &[SpanItem<&'static str>]) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("completed({})", volumes.len()));
        }
    }

    #[test]
    fn test_span_places_every_item_once() {
        let items = table(&[("a", 100), ("b", 100), ("c", 100), ("d", 60)]);
        let volumes = generate_span(&items, 250, FitAlgorithm::WorstFit, None).unwrap();

        // smallest first: d(60) + a(100) leaves 90, too little for b or c
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].items, vec!["d", "a"]);
        assert_eq!(volumes[0].size, 160);
        assert_eq!(volumes[1].items, vec!["b", "c"]);
        assert_eq!(volumes[1].size, 200);
        assert!((volumes[1].utilization - 80.0).abs() < 1e-9);

        let mut all: Vec<_> = volumes.iter().flat_map(|v| v.items.clone()).collect();
        all.sort();
        assert_eq!(all, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_span_of_empty_table_has_no_volumes() {
        let items: ItemTable<&str> = ItemTable::new();
        let volumes = generate_span(&items, 0, FitAlgorithm::BestFit, None).unwrap();
        assert!(volumes.is_empty());
    }

    #[test]
    fn test_span_rejects_oversized_item() {
        let items = table(&[("a", 10), ("huge", 500)]);
        let err = generate_span(&items, 100, FitAlgorithm::WorstFit, None).unwrap_err();
        match err {
            EngineError::ItemTooLarge { item, size, capacity } => {
                assert_eq!(item, "\"huge\"");
                assert_eq!(size, 500);
                assert_eq!(capacity, 100);
            }
            other => panic!("expected ItemTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_span_rejects_zero_capacity() {
        let items = table(&[("empty", 0)]);
        let err = generate_span(&items, 0, FitAlgorithm::FirstFit, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCapacity { .. }));
    }

    #[test]
    fn test_span_reports_progress_in_order() {
        let items = table(&[("a", 6), ("b", 6), ("c", 6)]);
        let progress = RecordingProgress::new();
        generate_span(&items, 10, FitAlgorithm::BestFit, Some(&progress)).unwrap();

        assert_eq!(
            progress.get_calls(),
            vec![
                "started(3, 10)",
                "volume(0, 6)",
                "volume(1, 6)",
                "volume(2, 6)",
                "completed(3)",
            ]
        );
    }

    #[test]
    fn test_generate_fitted_matches_fit() {
        let items = table(&[("a", 50), ("b", 200), ("c", 30)]);
        assert_eq!(
            generate_fitted(&items, 230, FitAlgorithm::BestFit),
            vec!["b", "c"]
        );
    }

    #[test]
    fn test_minimum_volumes() {
        assert_eq!(minimum_volumes(0, 100), 0);
        assert_eq!(minimum_volumes(100, 100), 1);
        assert_eq!(minimum_volumes(101, 100), 2);
        assert_eq!(minimum_volumes(5, 0), 0);
    }
}
