//! Visual markers and the shared board that holds them.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use sentinel_domain::{GeoPoint, PositionLookup};

/// One unit on the map, keyed by call sign.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualMarker {
    /// Assigned on creation and never changed; a new id means the marker
    /// was recreated.
    pub id: u64,
    pub call_sign: String,
    pub position: GeoPoint,
    pub color: &'static str,
    pub label: String,
    pub popup_content: String,
    /// `last_seen` of the snapshot last applied, in epoch milliseconds
    pub observed_at: Option<i64>,
}

/// Shared, call-sign keyed marker state.
///
/// Writers take the lock once per batch, so readers never observe a batch
/// half applied.
#[derive(Debug, Clone, Default)]
pub struct MarkerBoard {
    inner: Arc<RwLock<BTreeMap<String, VisualMarker>>>,
}

impl MarkerBoard {
    pub fn get(&self, call_sign: &str) -> Option<VisualMarker> {
        self.read().get(call_sign).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, VisualMarker> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, VisualMarker>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, VisualMarker>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PositionLookup for MarkerBoard {
    fn last_known(&self, call_sign: &str) -> Option<GeoPoint> {
        self.read().get(call_sign).map(|marker| marker.position)
    }
}
