//! Viewport-aware scroll window over an ordered item list.
//!
//! Every input runs the same pipeline: measure the viewport, recompute
//! `items_per_view` and `max_index`, then clamp `active_index`.

use std::ops::Range;

use log::{debug, info};

use crate::{
    carousel::breakpoints::{BreakpointTable, INITIAL_ITEMS_PER_VIEW},
    viewport::{ResizeSubscription, ViewportPort},
};

/// Largest valid start index for a window of `items_per_view` items.
pub fn recompute_max_index(item_count: usize, items_per_view: usize) -> usize {
    item_count.saturating_sub(items_per_view)
}

/// Clamps a caller-requested start index into `0..=max_index`.
pub fn clamp_active_index(requested: i64, max_index: usize) -> usize {
    if requested <= 0 {
        return 0;
    }
    match usize::try_from(requested) {
        Ok(requested) => requested.min(max_index),
        Err(_) => max_index,
    }
}

/// How the current window size was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sizing {
    /// No viewport measurement yet; `INITIAL_ITEMS_PER_VIEW` applies.
    Unmeasured,
    Measured {
        width_px: u32,
        items_per_view: usize,
    },
}

impl Sizing {
    pub fn items_per_view(self) -> usize {
        match self {
            Self::Unmeasured => INITIAL_ITEMS_PER_VIEW,
            Self::Measured { items_per_view, .. } => items_per_view,
        }
    }
}

/// Inputs that drive a recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowInput {
    ViewportChanged,
    ItemCountChanged(usize),
}

/// Position and size of the window. `active_index <= max_index` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub active_index: usize,
    pub max_index: usize,
    pub item_count: usize,
    pub sizing: Sizing,
}

impl WindowState {
    /// State before the first measurement.
    pub fn unmeasured(item_count: usize) -> Self {
        Self {
            active_index: 0,
            max_index: recompute_max_index(item_count, INITIAL_ITEMS_PER_VIEW),
            item_count,
            sizing: Sizing::Unmeasured,
        }
    }

    pub fn items_per_view(&self) -> usize {
        self.sizing.items_per_view()
    }

    /// `false` when every item already fits in one view.
    pub fn navigation_enabled(&self) -> bool {
        self.item_count > self.items_per_view()
    }
}

/// Snapshot handed to the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowView {
    pub active_index: usize,
    pub max_index: usize,
    pub items_per_view: usize,
    pub navigation_enabled: bool,
    /// Horizontal translation of the item strip, in percent of its width.
    pub offset_percent: f64,
}

impl From<&WindowState> for WindowView {
    fn from(state: &WindowState) -> Self {
        let items_per_view = state.items_per_view();
        Self {
            active_index: state.active_index,
            max_index: state.max_index,
            items_per_view,
            navigation_enabled: state.navigation_enabled(),
            offset_percent: state.active_index as f64 * (100.0 / items_per_view as f64),
        }
    }
}

/// Owns the scroll position of one carousel.
pub struct WindowController<V: ViewportPort> {
    label: String,
    viewport: V,
    subscription: ResizeSubscription,
    breakpoints: BreakpointTable,
    state: WindowState,
}

impl<V: ViewportPort> WindowController<V> {
    /// Subscribes to resize notices and takes the first measurement.
    pub fn new(
        label: impl Into<String>,
        viewport: V,
        breakpoints: BreakpointTable,
        item_count: usize,
    ) -> Self {
        let label = label.into();
        debug!(
            "carousel '{}': {} breakpoint tier(s), {} per view beyond the widest",
            label,
            breakpoints.tiers().len(),
            breakpoints.fallback_items_per_view()
        );
        let subscription = viewport.subscribe_resize();
        let mut controller = Self {
            label,
            viewport,
            subscription,
            breakpoints,
            state: WindowState::unmeasured(item_count),
        };
        controller.apply(WindowInput::ViewportChanged);
        controller
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn view(&self) -> WindowView {
        WindowView::from(&self.state)
    }

    pub fn active_index(&self) -> usize {
        self.state.active_index
    }

    pub fn max_index(&self) -> usize {
        self.state.max_index
    }

    pub fn items_per_view(&self) -> usize {
        self.state.items_per_view()
    }

    pub fn navigation_enabled(&self) -> bool {
        self.state.navigation_enabled()
    }

    /// Runs the measure, recompute, clamp pipeline for one input.
    pub fn apply(&mut self, input: WindowInput) {
        if let WindowInput::ItemCountChanged(item_count) = input {
            self.state.item_count = item_count;
        }

        let width_px = self.viewport.measure_width_px();
        let items_per_view = self.breakpoints.compute_items_per_view(width_px);
        self.state.sizing = Sizing::Measured {
            width_px,
            items_per_view,
        };
        self.state.max_index = recompute_max_index(self.state.item_count, items_per_view);

        let previous_active_index = self.state.active_index;
        self.state.active_index = previous_active_index.min(self.state.max_index);
        if self.state.active_index != previous_active_index {
            debug!(
                "carousel '{}': active index re-clamped {} -> {} (items={} per_view={})",
                self.label,
                previous_active_index,
                self.state.active_index,
                self.state.item_count,
                items_per_view
            );
        }
    }

    /// Processes queued resize notices. Returns `true` if a recompute ran.
    pub fn poll_viewport(&mut self) -> bool {
        if !self.subscription.take_resize_pending() {
            return false;
        }
        self.apply(WindowInput::ViewportChanged);
        true
    }

    /// Applies a new item count. Unchanged counts are ignored.
    pub fn set_item_count(&mut self, item_count: usize) {
        if item_count == self.state.item_count && self.state.sizing != Sizing::Unmeasured {
            return;
        }
        self.apply(WindowInput::ItemCountChanged(item_count));
    }

    /// Moves the window, clamping into range. Returns the resulting index.
    pub fn set_active_index(&mut self, requested: i64) -> usize {
        self.state.active_index = clamp_active_index(requested, self.state.max_index);
        self.state.active_index
    }

    pub fn can_step_backward(&self) -> bool {
        self.state.active_index > 0
    }

    pub fn can_step_forward(&self) -> bool {
        self.state.active_index < self.state.max_index
    }

    pub fn step_backward(&mut self) -> usize {
        self.set_active_index(self.state.active_index as i64 - 1)
    }

    pub fn step_forward(&mut self) -> usize {
        self.set_active_index(self.state.active_index as i64 + 1)
    }

    /// Indices of the items currently in view.
    pub fn visible_range(&self) -> Range<usize> {
        let start = self.state.active_index.min(self.state.item_count);
        let end = start
            .saturating_add(self.items_per_view())
            .min(self.state.item_count);
        start..end
    }

    /// Ends the resize registration. The controller cannot observe events afterwards.
    pub fn teardown(self) {
        let Self {
            label,
            subscription,
            ..
        } = self;
        drop(subscription);
        info!("carousel '{}': unsubscribed from viewport resizes", label);
    }
}
