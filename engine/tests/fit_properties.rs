//! Property-based tests for the fit strategies
//!
//! Uses proptest to check the guarantees every strategy makes over random
//! item tables and capacities

use discfit_engine::{generate_span, FitAlgorithm, FitResult, ItemTable};
use proptest::prelude::*;
use std::collections::HashSet;

fn table_from(sizes: &[u64]) -> ItemTable<usize> {
    sizes.iter().copied().enumerate().collect()
}

fn check_result(table: &ItemTable<usize>, capacity: u64, result: &FitResult<usize>) -> Result<(), TestCaseError> {
    prop_assert!(result.used <= capacity, "used {} exceeds capacity {}", result.used, capacity);

    let mut seen = HashSet::new();
    let mut sum = 0u64;
    for id in &result.items {
        prop_assert!(seen.insert(*id), "item {} chosen twice", id);
        let size = table.get(id);
        prop_assert!(size.is_some(), "item {} not in table", id);
        sum += size.unwrap_or_default();
    }
    prop_assert_eq!(sum, result.used);
    Ok(())
}

proptest! {
    #[test]
    fn prop_every_strategy_respects_capacity(
        sizes in prop::collection::vec(0u64..10_000, 0..40),
        capacity in 0u64..50_000
    ) {
        let table = table_from(&sizes);
        for algorithm in FitAlgorithm::ALL {
            let result = algorithm.fit(&table, capacity);
            check_result(&table, capacity, &result)?;
        }
    }

    #[test]
    fn prop_zero_capacity_chooses_nothing(
        sizes in prop::collection::vec(0u64..100, 0..20)
    ) {
        let table = table_from(&sizes);
        for algorithm in FitAlgorithm::ALL {
            let result = algorithm.fit(&table, 0);
            prop_assert!(result.is_empty());
            prop_assert_eq!(result.used, 0);
        }
    }

    #[test]
    fn prop_some_item_chosen_when_one_fits(
        sizes in prop::collection::vec(0u64..10_000, 1..30),
        capacity in 1u64..10_000
    ) {
        let table = table_from(&sizes);
        prop_assume!(sizes.iter().any(|&size| size <= capacity));
        for algorithm in FitAlgorithm::ALL {
            prop_assert!(!algorithm.fit(&table, capacity).is_empty(), "{} chose nothing", algorithm);
        }
    }

    #[test]
    fn prop_worst_fit_includes_at_least_as_many_items_as_best_fit(
        sizes in prop::collection::vec(0u64..5_000, 0..40),
        capacity in 0u64..20_000
    ) {
        let table = table_from(&sizes);
        let worst = FitAlgorithm::WorstFit.fit(&table, capacity);
        for algorithm in FitAlgorithm::ALL {
            prop_assert!(worst.count() >= algorithm.fit(&table, capacity).count());
        }
    }

    #[test]
    fn prop_best_fit_includes_largest_fitting_item(
        sizes in prop::collection::vec(0u64..5_000, 1..40),
        capacity in 1u64..5_000
    ) {
        let table = table_from(&sizes);
        let largest_fitting = sizes.iter().copied().filter(|&size| size <= capacity).max();
        prop_assume!(largest_fitting.is_some());

        let result = FitAlgorithm::BestFit.fit(&table, capacity);
        let chosen_sizes: Vec<u64> = result.items.iter().filter_map(|id| table.get(id)).collect();
        prop_assert!(chosen_sizes.contains(&largest_fitting.unwrap_or_default()));
    }

    #[test]
    fn prop_everything_fits_when_total_fits(
        sizes in prop::collection::vec(1u64..1_000, 0..20),
        slack in 0u64..1_000
    ) {
        let table = table_from(&sizes);
        let capacity = table.total_size() + slack;
        for algorithm in FitAlgorithm::ALL {
            let result = algorithm.fit(&table, capacity);
            prop_assert_eq!(result.count(), sizes.len());
            prop_assert_eq!(result.used, table.total_size());
        }
    }

    #[test]
    fn prop_strategies_are_deterministic(
        sizes in prop::collection::vec(0u64..1_000, 0..30),
        capacity in 0u64..5_000
    ) {
        let table = table_from(&sizes);
        for algorithm in FitAlgorithm::ALL {
            prop_assert_eq!(algorithm.fit(&table, capacity), algorithm.fit(&table, capacity));
        }
    }

    #[test]
    fn prop_span_places_every_item_exactly_once(
        sizes in prop::collection::vec(0u64..1_000, 0..40),
        capacity in 1_000u64..3_000
    ) {
        let table = table_from(&sizes);
        for algorithm in FitAlgorithm::ALL {
            let volumes = generate_span(&table, capacity, algorithm, None).unwrap();

            let mut seen = HashSet::new();
            for volume in &volumes {
                prop_assert!(!volume.items.is_empty());
                prop_assert!(volume.size <= capacity);
                for id in &volume.items {
                    prop_assert!(seen.insert(*id), "item {} placed twice", id);
                }
            }
            prop_assert_eq!(seen.len(), sizes.len());
        }
    }
}
