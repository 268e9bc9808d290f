//! Map renderer seam.

use tracing::{debug, info};

use crate::marker::VisualMarker;

/// Drawing primitives of the map the markers are shown on.
pub trait MapRenderer: Send {
    /// Draw a new marker and bind its popup
    fn add_marker(&mut self, marker: &VisualMarker);

    /// Move/restyle an existing marker and refresh its popup in place
    fn update_marker(&mut self, marker: &VisualMarker);

    /// Take a marker off the map
    fn remove_marker(&mut self, call_sign: &str);
}

impl<R: MapRenderer + ?Sized> MapRenderer for Box<R> {
    fn add_marker(&mut self, marker: &VisualMarker) {
        (**self).add_marker(marker);
    }

    fn update_marker(&mut self, marker: &VisualMarker) {
        (**self).update_marker(marker);
    }

    fn remove_marker(&mut self, call_sign: &str) {
        (**self).remove_marker(call_sign);
    }
}

/// Headless renderer that logs every primitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRenderer;

impl MapRenderer for TracingRenderer {
    fn add_marker(&mut self, marker: &VisualMarker) {
        info!(
            call_sign = %marker.call_sign,
            lat = marker.position.lat,
            lng = marker.position.lng,
            color = marker.color,
            "Marker added"
        );
    }

    fn update_marker(&mut self, marker: &VisualMarker) {
        debug!(
            call_sign = %marker.call_sign,
            lat = marker.position.lat,
            lng = marker.position.lng,
            color = marker.color,
            status = %marker.label,
            "Marker updated"
        );
    }

    fn remove_marker(&mut self, call_sign: &str) {
        info!(call_sign, "Marker removed");
    }
}
