mod stats_overlay;

pub use stats_overlay::{OverlayActions, OverlayStats, StatsOverlay};
