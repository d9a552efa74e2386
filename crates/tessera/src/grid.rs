//! A weighted occupancy grid for placing icons.
//!
//! Each cell carries a weight counting how many placed rectangles cover it.
//! Layout code adds the rectangle of every placed item and then looks for
//! the candidate rectangle with the lowest [`compute_weight`](OccupancyGrid::compute_weight).
//!
//! Rectangles must lie entirely inside the grid. One that does not is
//! logged as a warning and ignored.

use tessera_core::logging::targets;

/// Size in pixels of one grid cell.
pub const GRID_CELL_SIZE: f32 = 75.0;

/// Smallest comfortable touch target, in pixels.
pub const MIN_TOUCH_SIZE: f32 = 44.0;

/// The size in pixels of one grid cell.
pub fn grid_cell_size() -> f32 {
    GRID_CELL_SIZE
}

/// Grow `size` to at least [`MIN_TOUCH_SIZE`].
pub fn scale_for_touch(size: f32) -> f32 {
    size.max(MIN_TOUCH_SIZE)
}

/// A rectangle measured in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CellRect {
    /// Create a new rectangle.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A single cell.
    pub const fn cell(x: i32, y: i32) -> Self {
        Self::new(x, y, 1, 1)
    }

    /// Number of cells covered.
    pub fn area(&self) -> u32 {
        (self.width.max(0) as u32) * (self.height.max(0) as u32)
    }
}

/// A grid of per-cell weights.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupancyGrid {
    width: i32,
    height: i32,
    weights: Vec<u32>,
}

impl OccupancyGrid {
    /// Create an empty 0×0 grid. Call [`setup`](Self::setup) to size it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a grid of the given size with all weights zero.
    pub fn with_size(width: i32, height: i32) -> Self {
        let mut grid = Self::new();
        grid.setup(width, height);
        grid
    }

    /// Resize the grid and clear every weight.
    pub fn setup(&mut self, width: i32, height: i32) {
        self.width = width.max(0);
        self.height = height.max(0);
        self.weights = vec![0; (self.width as usize) * (self.height as usize)];
        tracing::trace!(target: targets::GRID, width = self.width, height = self.height, "grid set up");
    }

    /// Grid width in cells.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Add one to the weight of every cell in `rect`.
    pub fn add_weight(&mut self, rect: &CellRect) {
        if !self.check_bounds(rect, "add_weight") {
            return;
        }
        for index in self.indices(rect) {
            self.weights[index] += 1;
        }
    }

    /// Subtract one from the weight of every cell in `rect`, stopping at zero.
    pub fn remove_weight(&mut self, rect: &CellRect) {
        if !self.check_bounds(rect, "remove_weight") {
            return;
        }
        for index in self.indices(rect) {
            self.weights[index] = self.weights[index].saturating_sub(1);
        }
    }

    /// Sum of the weights of every cell in `rect`.
    pub fn compute_weight(&self, rect: &CellRect) -> u32 {
        if !self.check_bounds(rect, "compute_weight") {
            return 0;
        }
        self.indices(rect).map(|index| self.weights[index]).sum()
    }

    /// The weight of a single cell, or `None` outside the grid.
    pub fn weight_at(&self, x: i32, y: i32) -> Option<u32> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.weights[self.index(x, y)])
    }

    /// Returns true if `rect` lies entirely inside the grid.
    pub fn contains(&self, rect: &CellRect) -> bool {
        rect.x >= 0
            && rect.y >= 0
            && rect.width >= 0
            && rect.height >= 0
            && rect.x.checked_add(rect.width).is_some_and(|right| right <= self.width)
            && rect.y.checked_add(rect.height).is_some_and(|bottom| bottom <= self.height)
    }

    fn check_bounds(&self, rect: &CellRect, operation: &str) -> bool {
        if self.contains(rect) {
            return true;
        }
        tracing::warn!(
            target: targets::GRID,
            operation,
            ?rect,
            width = self.width,
            height = self.height,
            "rectangle is outside the grid bounds"
        );
        false
    }

    /// Row-major offset of an in-bounds cell.
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Offsets of every cell of an in-bounds `rect`.
    fn indices(&self, rect: &CellRect) -> impl Iterator<Item = usize> + use<> {
        let width = self.width as usize;
        let CellRect {
            x,
            y,
            width: w,
            height: h,
        } = *rect;
        let (x, y, w, h) = (x as usize, y as usize, w as usize, h as usize);
        (y..y + h).flat_map(move |row| (x..x + w).map(move |col| row * width + col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_sets_dimensions() {
        let mut grid = OccupancyGrid::new();
        grid.setup(20, 15);
        assert_eq!(grid.width(), 20);
        assert_eq!(grid.height(), 15);
        assert_eq!(grid.weight_at(19, 14), Some(0));
        assert_eq!(grid.weight_at(20, 0), None);
    }

    #[test]
    fn test_add_weight() {
        let mut grid = OccupancyGrid::with_size(10, 10);
        let rect = CellRect::new(2, 2, 3, 3);

        grid.add_weight(&rect);

        assert_eq!(grid.compute_weight(&rect), 9);
        assert_eq!(grid.compute_weight(&CellRect::cell(2, 2)), 1);
        assert_eq!(grid.compute_weight(&CellRect::cell(5, 5)), 0);
    }

    #[test]
    fn test_remove_weight() {
        let mut grid = OccupancyGrid::with_size(10, 10);
        let rect = CellRect::new(2, 2, 3, 3);

        grid.add_weight(&rect);
        grid.add_weight(&rect);
        assert_eq!(grid.compute_weight(&rect), 18);

        grid.remove_weight(&rect);
        assert_eq!(grid.compute_weight(&rect), 9);

        grid.remove_weight(&rect);
        assert_eq!(grid.compute_weight(&rect), 0);

        grid.remove_weight(&rect);
        assert_eq!(grid.compute_weight(&rect), 0);
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut grid = OccupancyGrid::with_size(5, 5);
        let outside = CellRect::new(3, 3, 4, 4);

        grid.add_weight(&outside);
        grid.remove_weight(&outside);

        assert_eq!(grid.compute_weight(&outside), 0);
        assert_eq!(grid.compute_weight(&CellRect::new(0, 0, 5, 5)), 0);
        assert!(!grid.contains(&CellRect::new(-1, 0, 1, 1)));
        assert!(!grid.contains(&CellRect::new(i32::MAX, 0, 1, 1)));
    }

    #[test]
    fn test_setup_clears_weights() {
        let mut grid = OccupancyGrid::with_size(8, 6);
        grid.add_weight(&CellRect::new(1, 1, 2, 2));

        grid.setup(12, 8);

        assert_eq!(grid.compute_weight(&CellRect::new(0, 0, 12, 8)), 0);
    }

    #[test]
    fn test_touch_scaling() {
        assert_eq!(scale_for_touch(10.0), MIN_TOUCH_SIZE);
        assert_eq!(scale_for_touch(64.0), 64.0);
        assert_eq!(grid_cell_size(), 75.0);
        assert_eq!(CellRect::new(0, 0, 3, 2).area(), 6);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_offsets_past_i32_range() {
        // 70_000 × 70_000 cells is more than i32::MAX; no storage is needed
        // to check the arithmetic.
        let grid = OccupancyGrid {
            width: 70_000,
            height: 70_000,
            weights: Vec::new(),
        };

        assert_eq!(grid.index(69_999, 69_999), 69_999 * 70_000 + 69_999);
        let corner: Vec<usize> = grid.indices(&CellRect::new(69_998, 69_999, 2, 1)).collect();
        assert_eq!(corner, vec![4_899_999_998, 4_899_999_999]);
    }
}
