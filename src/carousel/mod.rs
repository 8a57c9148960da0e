//! Carousel windowing: breakpoint table and the viewport-aware controller.

pub(crate) mod breakpoints;
pub(crate) mod window_controller;
