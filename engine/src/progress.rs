//! Progress reporting trait.
//!
//! This module defines the SpanProgress trait, which lets a front end follow
//! a multi-volume span as each volume is decided without tying the engine to
//! any particular UI.

use crate::model::ItemTable;
use crate::span::SpanItem;

/// Trait for receiving progress updates while a span is planned.
///
/// All methods are called synchronously from the planning thread.
pub trait SpanProgress<K>: Send {
    /// Called once before the first volume is fitted.
    fn on_span_started(&self, items: &ItemTable<K>, capacity: u64);

    /// Called each time a volume has been filled.
    ///
    /// `volume_index` is zero-based.
    fn on_volume_planned(&self, volume_index: usize, volume: &SpanItem<K>);

    /// Called when every item has been placed on a volume.
    fn on_span_completed(&self, volumes: &[SpanItem<K>]);
}
