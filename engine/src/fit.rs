//! Knapsack ("fit") strategies.
//!
//! Each strategy takes an item universe and a capacity and decides which
//! items go into the container. Items are never fragmented: an item is
//! either chosen whole or left out. All four strategies:
//! - never exceed the capacity
//! - return an empty result for zero capacity, even when zero-sized items exist
//! - return an empty result for an empty table
//! - treat their input as read-only and keep no state between calls
//!
//! They differ only in the order they consider items:
//! - **first fit**: table order, no sorting; cheapest, weakest packing
//! - **best fit**: largest first; high utilization with few items
//! - **worst fit**: smallest first; the most items, some slack left over
//! - **alternate fit**: alternates between the smallest and largest
//!   remaining items; balances item count against utilization
//!
//! Sorting is stable, so items of equal size are considered in table order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{FitResult, Item, ItemKey, ItemTable};

/// Accepts items in the given order while they fit.
///
/// Stops as soon as the remaining capacity is exactly zero. An item that does
/// not fit is skipped and never revisited.
fn fit_in_order<'a, K, I>(order: I, capacity: u64) -> FitResult<K>
where
    K: ItemKey + 'a,
    I: IntoIterator<Item = &'a Item<K>>,
{
    let mut result = FitResult::empty();
    let mut remaining = capacity;

    for item in order {
        if remaining == 0 {
            break;
        }
        if item.size <= remaining {
            result.items.push(item.id.clone());
            result.used += item.size;
            remaining -= item.size;
        }
    }

    result
}

fn sorted_ascending<K: ItemKey>(items: &ItemTable<K>) -> Vec<&Item<K>> {
    let mut order: Vec<&Item<K>> = items.iter().collect();
    order.sort_by_key(|item| item.size);
    order
}

/// First-fit: walk the table in its own order.
///
/// No sorting, so it runs in a single pass. Packing quality depends entirely
/// on the order items were inserted.
pub fn first_fit<K: ItemKey>(items: &ItemTable<K>, capacity: u64) -> FitResult<K> {
    fit_in_order(items.iter(), capacity)
}

/// Best-fit: consider the largest items first.
///
/// Tends to fill the container with the fewest items. Ties keep table order.
pub fn best_fit<K: ItemKey>(items: &ItemTable<K>, capacity: u64) -> FitResult<K> {
    let mut order: Vec<&Item<K>> = items.iter().collect();
    order.sort_by(|a, b| b.size.cmp(&a.size));
    fit_in_order(order, capacity)
}

/// Worst-fit: consider the smallest items first.
///
/// Includes the largest possible number of items. This is the default when
/// the goal is to get as many backup sets as possible onto one disc.
pub fn worst_fit<K: ItemKey>(items: &ItemTable<K>, capacity: u64) -> FitResult<K> {
    fit_in_order(sorted_ascending(items), capacity)
}

/// Alternate-fit: alternate between the small and large ends of the table.
///
/// Items are sorted ascending and split at `n / 2`. The front half is walked
/// from its smallest item upward and the back half from its largest item
/// downward. Each round tries one item from the front, then one from the
/// back. Both cursors advance every round whether or not their item fit, so
/// an item skipped on one round is never retried. The loop ends once the
/// capacity is used up exactly or both halves are exhausted.
pub fn alternate_fit<K: ItemKey>(items: &ItemTable<K>, capacity: u64) -> FitResult<K> {
    let order = sorted_ascending(items);
    let (front, back) = order.split_at(order.len() / 2);
    let back: Vec<&Item<K>> = back.iter().rev().copied().collect();

    let mut result = FitResult::empty();
    let mut remaining = capacity;
    let mut i = 0;
    let mut j = 0;

    while remaining > 0 && (i < front.len() || j < back.len()) {
        if let Some(item) = front.get(i) {
            if item.size <= remaining {
                result.items.push(item.id.clone());
                result.used += item.size;
                remaining -= item.size;
            }
            i += 1;
        }
        if let Some(item) = back.get(j) {
            if item.size <= remaining {
                result.items.push(item.id.clone());
                result.used += item.size;
                remaining -= item.size;
            }
            j += 1;
        }
    }

    result
}

/// The four fit strategies, selectable by name.
///
/// Serializes as `worst_fit` and friends; deserializes through [`FromStr`],
/// so configuration files accept the same spellings as the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitAlgorithm {
    FirstFit,
    BestFit,
    #[default]
    WorstFit,
    AlternateFit,
}

impl FitAlgorithm {
    pub const ALL: [FitAlgorithm; 4] = [
        FitAlgorithm::FirstFit,
        FitAlgorithm::BestFit,
        FitAlgorithm::WorstFit,
        FitAlgorithm::AlternateFit,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::FirstFit => "first_fit",
            Self::BestFit => "best_fit",
            Self::WorstFit => "worst_fit",
            Self::AlternateFit => "alternate_fit",
        }
    }

    /// Run this strategy.
    pub fn fit<K: ItemKey>(&self, items: &ItemTable<K>, capacity: u64) -> FitResult<K> {
        let result = match self {
            Self::FirstFit => first_fit(items, capacity),
            Self::BestFit => best_fit(items, capacity),
            Self::WorstFit => worst_fit(items, capacity),
            Self::AlternateFit => alternate_fit(items, capacity),
        };
        tracing::debug!(
            algorithm = self.name(),
            candidates = items.len(),
            capacity,
            chosen = result.count(),
            used = result.used,
            "fit decided"
        );
        result
    }
}

impl fmt::Display for FitAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FitAlgorithm {
    type Err = EngineError;

    /// Accepts `worst`, `worst_fit` and `worst-fit` (any case), and likewise
    /// for the other strategies.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        let base = normalized.strip_suffix("_fit").unwrap_or(&normalized);
        match base {
            "first" => Ok(Self::FirstFit),
            "best" => Ok(Self::BestFit),
            "worst" => Ok(Self::WorstFit),
            "alternate" | "alt" => Ok(Self::AlternateFit),
            _ => Err(EngineError::UnknownAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for FitAlgorithm {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// What the caller wants to optimize; maps onto a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitGoal {
    /// Include as many items as possible
    ItemCount,
    /// Use as much of the capacity as possible
    Utilization,
    /// Trade item count against utilization
    Balanced,
    /// Decide quickly on large tables; packing quality is secondary
    Speed,
}

impl FitGoal {
    pub fn algorithm(&self) -> FitAlgorithm {
        match self {
            Self::ItemCount => FitAlgorithm::WorstFit,
            Self::Utilization => FitAlgorithm::BestFit,
            Self::Balanced => FitAlgorithm::AlternateFit,
            Self::Speed => FitAlgorithm::FirstFit,
        }
    }
}

impl FromStr for FitGoal {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "item-count" | "count" => Ok(Self::ItemCount),
            "utilization" | "capacity" => Ok(Self::Utilization),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            _ => Err(EngineError::UnknownGoal {
                name: s.to_string(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for FitGoal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(items: &[(&'static str, u64)]) -> ItemTable<&'static str> {
        items.iter().copied().collect()
    }

    fn sorted(mut ids: Vec<&'static str>) -> Vec<&'static str> {
        ids.sort();
        ids
    }

    #[test]
    fn test_worst_fit_takes_two_of_three_equal_items() {
        let items = table(&[("a", 100), ("b", 100), ("c", 100)]);
        let result = worst_fit(&items, 250);
        assert_eq!(result.items, vec!["a", "b"]);
        assert_eq!(result.used, 200);
    }

    #[test]
    fn test_best_fit_skips_then_fills_exactly() {
        let items = table(&[("a", 50), ("b", 200), ("c", 30)]);
        let result = best_fit(&items, 230);
        assert_eq!(result.items, vec!["b", "c"]);
        assert_eq!(result.used, 230);
    }

    #[test]
    fn test_zero_capacity_admits_nothing() {
        let items = table(&[("a", 10), ("zero", 0)]);
        for algorithm in FitAlgorithm::ALL {
            let result = algorithm.fit(&items, 0);
            assert!(result.is_empty(), "{} chose {:?}", algorithm, result.items);
            assert_eq!(result.used, 0);
        }
    }

    #[test]
    fn test_empty_table_yields_empty_result() {
        let items: ItemTable<&str> = ItemTable::new();
        for algorithm in FitAlgorithm::ALL {
            assert_eq!(algorithm.fit(&items, 1_000), FitResult::empty());
        }
    }

    #[test]
    fn test_alternate_fit_pairs_smallest_with_largest() {
        let items = table(&[("a", 10), ("b", 20), ("c", 30), ("d", 40)]);
        let result = alternate_fit(&items, 50);
        assert_eq!(result.items, vec!["a", "d"]);
        assert_eq!(result.used, 50);
    }

    #[test]
    fn test_alternate_fit_single_item_lives_in_back_half() {
        let items = table(&[("only", 5)]);
        assert_eq!(alternate_fit(&items, 5).items, vec!["only"]);
        assert!(alternate_fit(&items, 4).is_empty());
    }

    #[test]
    fn test_alternate_fit_odd_length_back_half_is_longer() {
        // ascending: a(1) b(2) | c(3) d(4) e(5); back walked as e, d, c
        let items = table(&[("e", 5), ("c", 3), ("a", 1), ("d", 4), ("b", 2)]);
        let result = alternate_fit(&items, 100);
        assert_eq!(result.items, vec!["a", "e", "b", "d", "c"]);
        assert_eq!(result.used, 15);
    }

    #[test]
    fn test_alternate_fit_skipped_cursor_still_advances() {
        // ascending: a(1) b(2) | c(6) d(9)
        // round 1: a fits (rem 7), d does not fit and is passed over
        // round 2: b fits (rem 5), c does not fit
        let items = table(&[("a", 1), ("b", 2), ("c", 6), ("d", 9)]);
        let result = alternate_fit(&items, 8);
        assert_eq!(result.items, vec!["a", "b"]);
        assert_eq!(result.used, 3);
    }

    #[test]
    fn test_first_fit_uses_table_order() {
        let items = table(&[("big", 90), ("small", 10), ("mid", 50)]);
        let result = first_fit(&items, 100);
        assert_eq!(result.items, vec!["big", "small"]);
        assert_eq!(result.used, 100);
    }

    #[test]
    fn test_first_fit_skips_oversized_and_continues() {
        let items = table(&[("a", 60), ("b", 70), ("c", 40)]);
        let result = first_fit(&items, 100);
        assert_eq!(result.items, vec!["a", "c"]);
    }

    #[test]
    fn test_zero_sized_items_included_until_capacity_exhausted() {
        // "full" uses all capacity; zero-sized items after it are never seen
        let items = table(&[("z1", 0), ("full", 10), ("z2", 0)]);
        let result = first_fit(&items, 10);
        assert_eq!(result.items, vec!["z1", "full"]);

        // worst fit sorts zero-sized items to the front
        let result = worst_fit(&items, 10);
        assert_eq!(result.items, vec!["z1", "z2", "full"]);
    }

    #[test]
    fn test_best_fit_ties_keep_table_order() {
        let items = table(&[("x", 5), ("y", 5), ("z", 5)]);
        let result = best_fit(&items, 10);
        assert_eq!(result.items, vec!["x", "y"]);
    }

    #[test]
    fn test_best_fit_can_trail_worst_fit_utilization() {
        let items = table(&[("a", 3), ("b", 3), ("c", 4)]);
        assert_eq!(best_fit(&items, 6).used, 4);
        assert_eq!(worst_fit(&items, 6).used, 6);
    }

    #[test]
    fn test_single_item_is_same_for_every_strategy() {
        let items = table(&[("a", 42)]);
        for algorithm in FitAlgorithm::ALL {
            assert_eq!(algorithm.fit(&items, 42).items, vec!["a"]);
            assert!(algorithm.fit(&items, 41).is_empty());
        }
    }

    #[test]
    fn test_strategies_do_not_modify_input() {
        let items = table(&[("a", 3), ("b", 1), ("c", 2)]);
        for algorithm in FitAlgorithm::ALL {
            let _ = algorithm.fit(&items, 4);
        }
        let ids: Vec<_> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_every_strategy_fits_everything_when_room() {
        let items = table(&[("a", 3), ("b", 1), ("c", 2)]);
        for algorithm in FitAlgorithm::ALL {
            let result = algorithm.fit(&items, 6);
            assert_eq!(sorted(result.items), vec!["a", "b", "c"]);
            assert_eq!(result.used, 6);
        }
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("worst".parse::<FitAlgorithm>().unwrap(), FitAlgorithm::WorstFit);
        assert_eq!("best_fit".parse::<FitAlgorithm>().unwrap(), FitAlgorithm::BestFit);
        assert_eq!("First-Fit".parse::<FitAlgorithm>().unwrap(), FitAlgorithm::FirstFit);
        assert_eq!("alternate".parse::<FitAlgorithm>().unwrap(), FitAlgorithm::AlternateFit);
        assert!("random".parse::<FitAlgorithm>().is_err());
    }

    #[test]
    fn test_algorithm_display_round_trips_through_from_str() {
        for algorithm in FitAlgorithm::ALL {
            assert_eq!(algorithm.to_string().parse::<FitAlgorithm>().unwrap(), algorithm);
        }
    }

    #[test]
    fn test_goal_selects_algorithm() {
        assert_eq!(FitGoal::ItemCount.algorithm(), FitAlgorithm::WorstFit);
        assert_eq!(FitGoal::Utilization.algorithm(), FitAlgorithm::BestFit);
        assert_eq!(FitGoal::Balanced.algorithm(), FitAlgorithm::AlternateFit);
        assert_eq!(FitGoal::Speed.algorithm(), FitAlgorithm::FirstFit);
        assert_eq!("item_count".parse::<FitGoal>().unwrap(), FitGoal::ItemCount);
        assert!("fastest".parse::<FitGoal>().is_err());
    }

    #[test]
    fn test_default_algorithm_is_worst_fit() {
        assert_eq!(FitAlgorithm::default(), FitAlgorithm::WorstFit);
    }
}
