//! Viewport-width breakpoints that decide how many items a carousel shows.

use std::collections::HashSet;

use log::warn;

/// Items shown before the first viewport measurement.
///
/// Kept separate from the table fallback so the two can change independently.
pub const INITIAL_ITEMS_PER_VIEW: usize = 5;
/// Items shown when the viewport is wider than every tier.
pub const DEFAULT_FALLBACK_ITEMS_PER_VIEW: usize = 5;

/// One tier of the breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Breakpoint {
    /// Inclusive upper bound of the viewport width for this tier.
    pub max_width_px: u32,
    pub items_per_view: usize,
}

impl Breakpoint {
    pub const fn new(max_width_px: u32, items_per_view: usize) -> Self {
        Self {
            max_width_px,
            items_per_view,
        }
    }
}

/// Returns the stock tiers: phones, tablets, small laptops.
pub fn default_breakpoints() -> Vec<Breakpoint> {
    vec![
        Breakpoint::new(480, 2),
        Breakpoint::new(768, 3),
        Breakpoint::new(1024, 4),
    ]
}

/// Ascending, validated breakpoint table with a final fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointTable {
    tiers: Vec<Breakpoint>,
    fallback_items_per_view: usize,
}

impl Default for BreakpointTable {
    fn default() -> Self {
        Self {
            tiers: default_breakpoints(),
            fallback_items_per_view: DEFAULT_FALLBACK_ITEMS_PER_VIEW,
        }
    }
}

impl BreakpointTable {
    /// Builds a table from user-supplied tiers, repairing what it can.
    ///
    /// Zero-item tiers are dropped, tiers are ordered by width, and only the
    /// first tier for a given width survives.
    pub fn sanitized(tiers: &[Breakpoint], fallback_items_per_view: usize) -> Self {
        let mut seen_widths: HashSet<u32> = HashSet::new();
        let mut kept: Vec<Breakpoint> = Vec::with_capacity(tiers.len());
        for tier in tiers {
            if tier.items_per_view == 0 {
                warn!(
                    "Ignoring breakpoint at {}px with zero items per view",
                    tier.max_width_px
                );
                continue;
            }
            if seen_widths.insert(tier.max_width_px) {
                kept.push(*tier);
            } else {
                warn!(
                    "Ignoring duplicate breakpoint at {}px",
                    tier.max_width_px
                );
            }
        }
        kept.sort_by_key(|tier| tier.max_width_px);

        let fallback_items_per_view = if fallback_items_per_view == 0 {
            warn!(
                "Fallback items per view must be positive; using {}",
                DEFAULT_FALLBACK_ITEMS_PER_VIEW
            );
            DEFAULT_FALLBACK_ITEMS_PER_VIEW
        } else {
            fallback_items_per_view
        };

        Self {
            tiers: kept,
            fallback_items_per_view,
        }
    }

    pub fn tiers(&self) -> &[Breakpoint] {
        &self.tiers
    }

    pub fn fallback_items_per_view(&self) -> usize {
        self.fallback_items_per_view
    }

    /// Maps a viewport width to an item count. The first inclusive bound wins.
    pub fn compute_items_per_view(&self, viewport_width_px: u32) -> usize {
        self.tiers
            .iter()
            .find(|tier| viewport_width_px <= tier.max_width_px)
            .map(|tier| tier.items_per_view)
            .unwrap_or(self.fallback_items_per_view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_matches_stock_widths() {
        let table = BreakpointTable::default();

        assert_eq!(table.compute_items_per_view(0), 2);
        assert_eq!(table.compute_items_per_view(320), 2);
        assert_eq!(table.compute_items_per_view(480), 2);
        assert_eq!(table.compute_items_per_view(481), 3);
        assert_eq!(table.compute_items_per_view(768), 3);
        assert_eq!(table.compute_items_per_view(769), 4);
        assert_eq!(table.compute_items_per_view(1024), 4);
        assert_eq!(table.compute_items_per_view(1025), 5);
        assert_eq!(table.compute_items_per_view(1200), 5);
        assert_eq!(table.compute_items_per_view(u32::MAX), 5);
    }

    #[test]
    fn test_sanitized_orders_tiers_and_drops_invalid_entries() {
        let table = BreakpointTable::sanitized(
            &[
                Breakpoint::new(1024, 4),
                Breakpoint::new(480, 2),
                Breakpoint::new(600, 0),
                Breakpoint::new(480, 7),
                Breakpoint::new(768, 3),
            ],
            6,
        );

        assert_eq!(
            table.tiers(),
            &[
                Breakpoint::new(480, 2),
                Breakpoint::new(768, 3),
                Breakpoint::new(1024, 4),
            ]
        );
        assert_eq!(table.compute_items_per_view(600), 3);
        assert_eq!(table.compute_items_per_view(2000), 6);
    }

    #[test]
    fn test_sanitized_replaces_zero_fallback() {
        let table = BreakpointTable::sanitized(&default_breakpoints(), 0);
        assert_eq!(
            table.fallback_items_per_view(),
            DEFAULT_FALLBACK_ITEMS_PER_VIEW
        );
    }

    #[test]
    fn test_empty_table_always_uses_fallback() {
        let table = BreakpointTable::sanitized(&[], 3);
        assert_eq!(table.compute_items_per_view(100), 3);
        assert_eq!(table.compute_items_per_view(5000), 3);
    }
}
