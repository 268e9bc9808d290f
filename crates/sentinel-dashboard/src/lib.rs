//! # Sentinel Dashboard
//!
//! Live map state for the Sentinel Grid.
//!
//! Snapshot batches arrive on a [`TelemetryBus`], the [`Reconciler`] merges
//! them into a [`MarkerBoard`] and drives a [`MapRenderer`]. Marker colors and
//! popups come from the pure [`present`] mapping.

#![forbid(unsafe_code)]

pub mod marker;
pub mod presentation;
pub mod reconciler;
pub mod renderer;
pub mod runtime;
pub mod subscription;

pub use marker::{MarkerBoard, VisualMarker};
pub use presentation::{ALERT_COLOR, NOMINAL_COLOR, Presentation, popup_for, present};
pub use reconciler::{ReconcileReport, Reconciler};
pub use renderer::{MapRenderer, TracingRenderer};
pub use runtime::{DashboardHandle, DriveSummary, drive};
pub use subscription::{TelemetryBus, TelemetrySubscription};
