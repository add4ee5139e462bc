//! Pure placement maths.  No OS calls happen here.
//!
//! All fraction-to-pixel conversions truncate toward zero after an `f32`
//! multiply, so results are reproducible across runs and backends.

use crate::catalog::Layout;
use crate::command::{Direction, Edge, Rect};

/// Smallest width or height any placement produces.
pub const MIN_SIZE: i32 = 100;

/// How much of a nudged window must stay inside the work area.
pub const MIN_VISIBLE: i32 = 50;

fn scale(length: i32, fraction: f32) -> i32 {
    (length as f32 * fraction) as i32
}

/// Absolute rectangle for `layout` inside `area`, inset by `margin` and
/// floored at [`MIN_SIZE`].
pub fn layout_rect(area: Rect, layout: &Layout, margin: i32) -> Rect {
    let base_x = area.x + scale(area.width, layout.x);
    let base_y = area.y + scale(area.height, layout.y);
    let base_w = scale(area.width, layout.width);
    let base_h = scale(area.height, layout.height);
    Rect::new(
        base_x + margin,
        base_y + margin,
        (base_w - 2 * margin).max(MIN_SIZE),
        (base_h - 2 * margin).max(MIN_SIZE),
    )
}

/// Grid shape for `n` windows in `area`: near-square, or a single row when
/// the area is more than twice as wide as it is tall.
pub fn grid_dimensions(n: usize, area: Rect) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    if area.width > area.height * 2 {
        return (n, 1);
    }
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);
    (cols, rows)
}

/// One cell per window, filled row by row.
pub fn grid_cells(n: usize, area: Rect, margin: i32) -> Vec<Rect> {
    let (cols, rows) = grid_dimensions(n, area);
    if n == 0 {
        return Vec::new();
    }
    let cell_w = area.width / cols as i32;
    let cell_h = area.height / rows as i32;
    (0..n)
        .map(|i| {
            let col = (i % cols) as i32;
            let row = (i / cols) as i32;
            Rect::new(
                area.x + col * cell_w + margin,
                area.y + row * cell_h + margin,
                cell_w - 2 * margin,
                cell_h - 2 * margin,
            )
        })
        .collect()
}

/// Master pane (60 % of the width, full height) followed by `n - 1` stacked
/// panes sharing the rest.  Returns an empty vector for `n < 2`.
pub fn master_stack(n: usize, area: Rect, margin: i32) -> Vec<Rect> {
    if n < 2 {
        return Vec::new();
    }
    let master_w = scale(area.width, 0.6);
    let stack_w = area.width - master_w;
    let stack_h = area.height / (n as i32 - 1);

    let mut rects = Vec::with_capacity(n);
    rects.push(Rect::new(
        area.x + margin,
        area.y + margin,
        master_w - 2 * margin,
        area.height - 2 * margin,
    ));
    for i in 1..n as i32 {
        rects.push(Rect::new(
            area.x + master_w + margin,
            area.y + (i - 1) * stack_h + margin,
            stack_w - 2 * margin,
            stack_h - 2 * margin,
        ));
    }
    rects
}

/// Re-express `rect` (inside `from`) at the same relative place in `to`.
pub fn transfer(rect: Rect, from: Rect, to: Rect) -> Rect {
    let fx = (rect.x - from.x) as f32 / from.width as f32;
    let fy = (rect.y - from.y) as f32 / from.height as f32;
    let fw = rect.width as f32 / from.width as f32;
    let fh = rect.height as f32 / from.height as f32;
    Rect::new(
        to.x + scale(to.width, fx),
        to.y + scale(to.height, fy),
        scale(to.width, fw),
        scale(to.height, fh),
    )
}

/// `rect` moved `amount` units towards `dir`.
pub fn shifted(rect: Rect, dir: Direction, amount: i32) -> Rect {
    let mut r = rect;
    match dir {
        Direction::Left => r.x -= amount,
        Direction::Right => r.x += amount,
        Direction::Up => r.y -= amount,
        Direction::Down => r.y += amount,
    }
    r
}

/// `rect` grown (right/down) or shrunk (left/up) by `amount`, floored at
/// [`MIN_SIZE`].
pub fn resized(rect: Rect, dir: Direction, amount: i32) -> Rect {
    let mut r = rect;
    match dir {
        Direction::Left => r.width -= amount,
        Direction::Right => r.width += amount,
        Direction::Up => r.height -= amount,
        Direction::Down => r.height += amount,
    }
    r.width = r.width.max(MIN_SIZE);
    r.height = r.height.max(MIN_SIZE);
    r
}

/// `rect` moved by `(dx, dy)` but keeping at least [`MIN_VISIBLE`] units of
/// it inside `area` on each axis.
pub fn nudged(rect: Rect, dx: i32, dy: i32, area: Rect) -> Rect {
    let min_x = area.x - rect.width + MIN_VISIBLE;
    let max_x = area.right() - MIN_VISIBLE;
    let min_y = area.y - rect.height + MIN_VISIBLE;
    let max_y = area.bottom() - MIN_VISIBLE;
    Rect::new(
        (rect.x + dx).max(min_x).min(max_x),
        (rect.y + dy).max(min_y).min(max_y),
        rect.width,
        rect.height,
    )
}

/// `rect` resized by `(dw, dh)` from `edge`.
///
/// With [`Edge::Far`] the left/top corner stays put; with
/// [`Edge::Leading`] the right/bottom edges stay put and a negative delta
/// grows the window towards the left/top.  The size is clamped between
/// [`MIN_SIZE`] and the work-area size.
pub fn stretched(rect: Rect, dw: i32, dh: i32, edge: Edge, area: Rect) -> Rect {
    let (w, h) = match edge {
        Edge::Far => (rect.width + dw, rect.height + dh),
        Edge::Leading => (rect.width - dw, rect.height - dh),
    };
    let w = w.min(area.width).max(MIN_SIZE);
    let h = h.min(area.height).max(MIN_SIZE);
    match edge {
        Edge::Far => Rect::new(rect.x, rect.y, w, h),
        Edge::Leading => Rect::new(rect.right() - w, rect.bottom() - h, w, h),
    }
}

/// A window at `fraction` of the area's size, centered in it.
pub fn centered(area: Rect, fraction: f32) -> Rect {
    let w = scale(area.width, fraction);
    let h = scale(area.height, fraction);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const FHD: Rect = Rect::new(0, 0, 1920, 1080);

    #[test]
    fn layout_rect_applies_margin() {
        let left_half = Layout::new("Left Half", 0.0, 0.0, 0.5, 1.0);
        assert_eq!(layout_rect(FHD, &left_half, 6), Rect::new(6, 6, 948, 1068));
    }

    #[test]
    fn layout_rect_is_relative_to_work_area_origin() {
        let area = Rect::new(1920, 40, 2560, 1400);
        let right_half = Layout::new("Right Half", 0.5, 0.0, 0.5, 1.0);
        assert_eq!(
            layout_rect(area, &right_half, 0),
            Rect::new(1920 + 1280, 40, 1280, 1400)
        );
    }

    #[test]
    fn layout_rect_floors_size() {
        let tiny = Layout::new("tiny", 0.0, 0.0, 0.01, 0.01);
        let r = layout_rect(FHD, &tiny, 6);
        assert_eq!((r.width, r.height), (MIN_SIZE, MIN_SIZE));
    }

    #[test]
    fn grid_is_near_square() {
        assert_eq!(grid_dimensions(1, FHD), (1, 1));
        assert_eq!(grid_dimensions(2, FHD), (2, 1));
        assert_eq!(grid_dimensions(3, FHD), (2, 2));
        assert_eq!(grid_dimensions(4, FHD), (2, 2));
        assert_eq!(grid_dimensions(5, FHD), (3, 2));
        assert_eq!(grid_dimensions(7, FHD), (3, 3));
        assert_eq!(grid_dimensions(10, FHD), (4, 3));
        assert_eq!(grid_dimensions(0, FHD), (0, 0));
    }

    #[test]
    fn ultrawide_area_gets_a_single_row() {
        let ultrawide = Rect::new(0, 0, 5120, 1440);
        assert_eq!(grid_dimensions(4, ultrawide), (4, 1));
        // exactly 2:1 is not "more than"
        assert_eq!(grid_dimensions(4, Rect::new(0, 0, 2000, 1000)), (2, 2));
    }

    #[test]
    fn three_windows_on_full_hd() {
        let cells = grid_cells(3, FHD, 6);
        assert_eq!(
            cells,
            vec![
                Rect::new(6, 6, 948, 528),
                Rect::new(966, 6, 948, 528),
                Rect::new(6, 546, 948, 528),
            ]
        );
    }

    #[test]
    fn master_stack_splits_60_40() {
        let rects = master_stack(3, FHD, 0);
        assert_eq!(rects[0], Rect::new(0, 0, 1152, 1080));
        assert_eq!(rects[1], Rect::new(1152, 0, 768, 540));
        assert_eq!(rects[2], Rect::new(1152, 540, 768, 540));
        assert!(master_stack(1, FHD, 0).is_empty());
    }

    #[test]
    fn transfer_keeps_relative_placement() {
        let small = Rect::new(0, 0, 1000, 1000);
        let big = Rect::new(1000, 0, 2000, 1000);
        let r = transfer(Rect::new(250, 500, 500, 250), small, big);
        assert_eq!(r, Rect::new(1500, 500, 1000, 250));
    }

    #[test]
    fn fixed_steps() {
        let r = Rect::new(100, 100, 400, 300);
        assert_eq!(shifted(r, Direction::Left, 60), Rect::new(40, 100, 400, 300));
        assert_eq!(shifted(r, Direction::Down, 60), Rect::new(100, 160, 400, 300));
        assert_eq!(resized(r, Direction::Right, 60), Rect::new(100, 100, 460, 300));
        assert_eq!(resized(r, Direction::Up, 60), Rect::new(100, 100, 400, 240));
        let small = Rect::new(0, 0, 120, 120);
        assert_eq!(resized(small, Direction::Left, 60).width, MIN_SIZE);
    }

    #[test]
    fn nudge_keeps_a_sliver_visible() {
        let r = Rect::new(10, 10, 400, 300);
        assert_eq!(nudged(r, -15, 0, FHD), Rect::new(-5, 10, 400, 300));
        assert_eq!(nudged(r, -1000, 0, FHD).x, -400 + MIN_VISIBLE);
        assert_eq!(nudged(r, 5000, 0, FHD).x, 1920 - MIN_VISIBLE);
        assert_eq!(nudged(r, 0, 5000, FHD).y, 1080 - MIN_VISIBLE);
    }

    #[test]
    fn stretch_far_edge() {
        let r = Rect::new(100, 100, 400, 300);
        assert_eq!(stretched(r, 15, 0, Edge::Far, FHD), Rect::new(100, 100, 415, 300));
        assert_eq!(stretched(r, 0, -15, Edge::Far, FHD), Rect::new(100, 100, 400, 285));
        assert_eq!(stretched(r, 9999, 0, Edge::Far, FHD).width, 1920);
    }

    #[test]
    fn stretch_leading_edge_anchors_far_edges() {
        let r = Rect::new(100, 100, 400, 300);
        // grow to the left
        assert_eq!(stretched(r, -15, 0, Edge::Leading, FHD), Rect::new(85, 100, 415, 300));
        // shrink from the top
        assert_eq!(stretched(r, 0, 15, Edge::Leading, FHD), Rect::new(100, 115, 400, 285));
        // floor keeps the right edge fixed
        let s = stretched(r, 390, 0, Edge::Leading, FHD);
        assert_eq!((s.width, s.right()), (MIN_SIZE, 500));
    }

    #[test]
    fn centered_at_80_percent() {
        assert_eq!(centered(FHD, 0.8), Rect::new(192, 108, 1536, 864));
    }
}
