//! Geometry for grid maps.

use std::ops::Add;
use std::ops::AddAssign;
use std::ops::Mul;
use std::ops::Neg;
use std::ops::Sub;
use std::ops::SubAssign;

use serde::Deserialize;
use serde::Serialize;

/// A two-dimensional grid point.
///
/// We use the usual console convention: x increases to the right, y increases
/// downwards. `Point` values add and subtract componentwise.
#[derive(
  Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Serialize,
  Deserialize,
)]
pub struct Point {
  pub x: i32,
  pub y: i32,
}

impl Point {
  /// Creates a new `Point` with the given coordinates.
  #[inline]
  pub fn new(x: i32, y: i32) -> Self {
    Self { x, y }
  }

  /// Creates a new `Point` representing the origin.
  #[inline]
  pub fn zero() -> Self {
    Self::new(0, 0)
  }
}

impl Add for Point {
  type Output = Point;
  #[inline]
  fn add(self, other: Point) -> Point {
    Point::new(self.x + other.x, self.y + other.y)
  }
}

impl Sub for Point {
  type Output = Point;
  #[inline]
  fn sub(self, other: Point) -> Point {
    Point::new(self.x - other.x, self.y - other.y)
  }
}

impl Mul<i32> for Point {
  type Output = Point;
  #[inline]
  fn mul(self, k: i32) -> Point {
    Point::new(self.x * k, self.y * k)
  }
}

impl Neg for Point {
  type Output = Point;
  #[inline]
  fn neg(self) -> Point {
    Point::new(-self.x, -self.y)
  }
}

impl AddAssign for Point {
  #[inline]
  fn add_assign(&mut self, other: Point) {
    *self = *self + other;
  }
}

impl SubAssign for Point {
  #[inline]
  fn sub_assign(&mut self, other: Point) {
    *self = *self - other;
  }
}

/// A distance metric over grid points.
///
/// The metric decides what "within radius r" means, and therefore the shape
/// of a field of view: `Chebyshev` gives squares, `Manhattan` diamonds, and
/// `Euclidean` circles.
#[derive(
  Copy, Clone, PartialEq, Eq, Debug, Hash, Serialize, Deserialize,
)]
pub enum Metric {
  Chebyshev,
  Manhattan,
  Euclidean,
}

impl Metric {
  /// Returns whether `b` lies within `radius` of `a` under this metric.
  ///
  /// Exact in integer arithmetic; `Euclidean` compares squared distances so
  /// no rounding is involved.
  pub fn within(self, a: Point, b: Point, radius: i32) -> bool {
    let dx = (b.x - a.x).abs();
    let dy = (b.y - a.y).abs();
    match self {
      Metric::Chebyshev => dx.max(dy) <= radius,
      Metric::Manhattan => dx + dy <= radius,
      Metric::Euclidean => {
        let (dx, dy, r) = (dx as i64, dy as i64, radius as i64);
        dx * dx + dy * dy <= r * r
      }
    }
  }
}

impl Default for Metric {
  fn default() -> Self {
    Metric::Chebyshev
  }
}

/// An axis-aligned rectangle, stored as its sorted corners.
///
/// The point range is half-open: points colinear with the lower-right corner
/// are *not* part of the rectangle.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Rect {
  min: Point,
  max: Point,
}

impl Rect {
  /// Creates a new `Rect` with the given points as opposing corners.
  pub fn new(p1: Point, p2: Point) -> Self {
    let min = Point::new(p1.x.min(p2.x), p1.y.min(p2.y));
    let max = Point::new(p1.x.max(p2.x), p1.y.max(p2.y));
    Self { min, max }
  }

  /// Creates a new `Rect` of the given dimensions with its upper-left corner
  /// at the origin.
  pub fn with_dims(width: i32, height: i32) -> Self {
    Self::new(Point::zero(), Point::new(width.abs(), height.abs()))
  }

  /// Returns the upper-left corner of this `Rect`.
  #[inline]
  pub fn upper_left(self) -> Point {
    self.min
  }

  /// Returns the lower-right corner of this `Rect`.
  #[inline]
  pub fn lower_right(self) -> Point {
    self.max
  }

  /// Returns the width of this `Rect`.
  #[inline]
  pub fn width(self) -> i32 {
    self.max.x - self.min.x
  }

  /// Returns the height of this `Rect`.
  #[inline]
  pub fn height(self) -> i32 {
    self.max.y - self.min.y
  }

  /// Returns the area of this `Rect`.
  #[inline]
  pub fn area(self) -> i32 {
    self.width() * self.height()
  }

  /// Returns the center of this `Rect`.
  #[inline]
  pub fn center(self) -> Point {
    Point::new(
      self.min.x + self.width() / 2,
      self.min.y + self.height() / 2,
    )
  }

  /// Returns whether this `Rect` contains a given point.
  #[inline]
  pub fn contains(self, p: Point) -> bool {
    (self.min.x..self.max.x).contains(&p.x)
      && (self.min.y..self.max.y).contains(&p.y)
  }

  /// Translates this `Rect` such that its center is (approximately) at
  /// `center`.
  pub fn centered_on(self, center: Point) -> Self {
    let offset = center - self.center();
    Self {
      min: self.min + offset,
      max: self.max + offset,
    }
  }

  /// Computes the intersection of this `Rect` with `other`.
  ///
  /// Returns `None` if they do not intersect at all.
  pub fn intersect(self, other: Rect) -> Option<Rect> {
    let min = Point::new(
      self.min.x.max(other.min.x),
      self.min.y.max(other.min.y),
    );
    let max = Point::new(
      self.max.x.min(other.max.x),
      self.max.y.min(other.max.y),
    );
    if min.x >= max.x || min.y >= max.y {
      return None;
    }
    Some(Rect { min, max })
  }

  /// Returns an iterator over all points in this rectangle, in row-major
  /// order.
  pub fn points(self) -> impl Iterator<Item = Point> {
    let Rect { min, max } = self;
    (min.y..max.y)
      .flat_map(move |y| (min.x..max.x).map(move |x| Point::new(x, y)))
  }
}
