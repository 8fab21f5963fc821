//! Geometry shared by the RFB decoder crates.
//!
//! - [`Point`] - 2D point / offset with i32 coordinates
//! - [`Rect`] - rectangle with position and dimensions
//!
//! Wire rectangles carry unsigned 16-bit fields; they are widened into these
//! types once at the protocol boundary so that offsets (for example the
//! CopyRect source delta) can be negative.

/// A 2D point with integer coordinates. Also used as a signed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A rectangle defined by top-left position and dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge (x + width).
    pub const fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge (y + height).
    pub const fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub const fn contains_point(&self, px: i32, py: i32) -> bool {
        px >= self.x && (px as i64) < self.right() && py >= self.y && (py as i64) < self.bottom()
    }

    /// True when `other` lies entirely inside `self`. An empty rectangle is
    /// contained as long as its origin is within the closed bounds.
    pub const fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// The same rectangle moved by `offset`.
    pub const fn translate(&self, offset: Point) -> Rect {
        Rect::new(
            self.x + offset.x,
            self.y + offset.y,
            self.width,
            self.height,
        )
    }
}
