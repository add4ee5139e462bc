//! Animated window transitions.
//!
//! [`smooth_move`] blocks the calling thread for `steps × frame` while it
//! walks the window along a sine ease-out curve, then lands it exactly on
//! the target.

use crate::command::{Rect, WindowId};
use crate::traits::Desktop;
use std::f64::consts::FRAC_PI_2;
use std::time::Duration;

/// Animation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    /// When `false`, placements are applied in a single call.
    pub enabled: bool,
    /// Intermediate placements per transition.
    pub steps: u32,
    /// Pause after each intermediate placement.
    pub frame: Duration,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            enabled: true,
            steps: 12,
            frame: Duration::from_millis(10),
        }
    }
}

/// Progress after step `i` of `steps`: `sin(i / steps · π/2)`.
#[inline]
pub fn ease(i: u32, steps: u32) -> f64 {
    (i as f64 / steps as f64 * FRAC_PI_2).sin()
}

#[inline]
fn blend_axis(start: i32, target: i32, f: f64) -> i32 {
    start + ((target - start) as f64 * f) as i32
}

/// Each field of `start` moved fraction `f` of the way to `target`,
/// truncated toward zero.
pub fn blend(start: Rect, target: Rect, f: f64) -> Rect {
    Rect::new(
        blend_axis(start.x, target.x, f),
        blend_axis(start.y, target.y, f),
        blend_axis(start.width, target.width, f),
        blend_axis(start.height, target.height, f),
    )
}

/// The intermediate rectangles of a transition (not including the final
/// exact placement).
pub fn frames(start: Rect, target: Rect, steps: u32) -> impl Iterator<Item = Rect> {
    (1..=steps).map(move |i| blend(start, target, ease(i, steps)))
}

/// Move `window` to `target`, animated if `animation.enabled`.
///
/// A window already at `target` is left alone.  Otherwise every
/// intermediate frame is applied, then `target` itself.
pub fn smooth_move<D: Desktop>(
    desktop: &D,
    window: WindowId,
    target: Rect,
    animation: &Animation,
) -> Result<(), D::Error> {
    if !animation.enabled {
        return desktop.set_window_rect(window, target);
    }
    let start = desktop.window_rect(window)?;
    if start == target {
        return Ok(());
    }
    for frame in frames(start, target, animation.steps) {
        desktop.set_window_rect(window, frame)?;
        if !animation.frame.is_zero() {
            std::thread::sleep(animation.frame);
        }
    }
    desktop.set_window_rect(window, target)
}
