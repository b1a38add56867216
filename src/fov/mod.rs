//! Field-of-view computation and bookkeeping.
//!
//! [`Fov`] is double-buffered: `current` holds the points visible now, and
//! `previous` holds the points that were visible when [`Fov::reset()`] last
//! ran. The deltas the rest of the crate consumes fall out of the two sets:
//! newly seen is `current − previous`, newly unseen is `previous − current`.
//! A [`Fov::calculate()`] is a reset followed by a scan; a
//! [`Fov::calculate_append()`] is a scan alone, so several observers can be
//! merged into one result while the deltas stay relative to the same
//! pre-reset snapshot.

use std::collections::HashSet;
use std::mem;

use crate::geo::Metric;
use crate::geo::Point;

/// A field-of-view result for one observer (or several merged ones).
#[derive(Clone, Debug, Default)]
pub struct Fov {
  previous: HashSet<Point>,
  current: HashSet<Point>,
}

impl Fov {
  /// Creates an empty `Fov`.
  pub fn new() -> Fov {
    Fov::default()
  }

  /// Returns whether `p` is currently visible. O(1).
  #[inline]
  pub fn sees(&self, p: Point) -> bool {
    self.current.contains(&p)
  }

  /// Returns the set of currently visible points.
  pub fn visible(&self) -> &HashSet<Point> {
    &self.current
  }

  /// Returns the points visible now that were not visible at the last
  /// reset.
  pub fn newly_seen(&self) -> impl Iterator<Item = Point> + '_ {
    self
      .current
      .iter()
      .copied()
      .filter(move |p| !self.previous.contains(p))
  }

  /// Returns the points visible at the last reset that are not visible now.
  ///
  /// Appending more area to the result shrinks this set: a point covered by
  /// a later scan is no longer newly unseen.
  pub fn newly_unseen(&self) -> impl Iterator<Item = Point> + '_ {
    self
      .previous
      .iter()
      .copied()
      .filter(move |p| !self.current.contains(p))
  }

  /// Starts a new epoch: snapshots the current visible set and clears it.
  ///
  /// After a bare reset, everything that was visible is newly unseen and
  /// nothing is newly seen; subsequent scans refine both deltas.
  pub fn reset(&mut self) {
    mem::swap(&mut self.previous, &mut self.current);
    self.current.clear();
  }

  /// From-scratch recomputation: [`reset()`] followed by one scan.
  ///
  /// [`reset()`]: Fov::reset
  pub fn calculate(
    &mut self,
    origin: Point,
    radius: i32,
    metric: Metric,
    is_opaque: &mut dyn FnMut(Point) -> bool,
  ) {
    self.reset();
    self.calculate_append(origin, radius, metric, is_opaque);
  }

  /// Additive recomputation: scans from `origin` and unions the lit points
  /// into the current set, leaving the reset snapshot alone.
  pub fn calculate_append(
    &mut self,
    origin: Point,
    radius: i32,
    metric: Metric,
    is_opaque: &mut dyn FnMut(Point) -> bool,
  ) {
    let current = &mut self.current;
    shadowcast(origin, radius, metric, is_opaque, &mut |p| {
      current.insert(p);
    });
  }
}

/// Computes the field of view from `origin` by recursive shadowcasting.
///
/// `is_opaque` reports whether a point blocks sight; `ignite` is called on
/// every lit point, the origin included. Opaque points are themselves lit
/// when a ray reaches them, so walls show up at the edge of a view. Points
/// outside `radius` under `metric` are never lit.
pub fn shadowcast(
  origin: Point,
  radius: i32,
  metric: Metric,
  is_opaque: &mut dyn FnMut(Point) -> bool,
  ignite: &mut dyn FnMut(Point),
) {
  ignite(origin);
  for octant in 0..8 {
    cast(origin, radius, metric, octant, 1, 1.0, 0.0, is_opaque, ignite);
  }
}

/// Maps octant-local `(col, row)` offsets into world offsets.
///
/// The recursion works in a single canonical octant where `|col| <= row`;
/// the eight images of that octant tile the whole neighborhood:
///
/// ```text
/// \ 2|1 /
///  \ | /
/// 3 \|/ 0
/// ---o---   +-> x
/// 4 /|\ 7   |
///  / | \    v y
/// / 5|6 \
/// ```
fn octant_offset(octant: u8, col: i32, row: i32) -> Point {
  match octant {
    0 => Point::new(col, row),
    1 => Point::new(row, col),
    2 => Point::new(row, -col),
    3 => Point::new(col, -row),
    4 => Point::new(-col, -row),
    5 => Point::new(-row, -col),
    6 => Point::new(-row, col),
    _ => Point::new(-col, row),
  }
}

fn cast(
  origin: Point,
  radius: i32,
  metric: Metric,
  octant: u8,
  row: i32,
  mut start: f64,
  end: f64,
  is_opaque: &mut dyn FnMut(Point) -> bool,
  ignite: &mut dyn FnMut(Point),
) {
  if start < end {
    return;
  }

  let mut new_start = start;
  for dist in row..=radius {
    let dy = -dist;
    let mut blocked = false;
    for dx in -dist..=0 {
      // Slopes of the far corners of this cell, as seen from the origin.
      let l_slope = (dx as f64 - 0.5) / (dy as f64 + 0.5);
      let r_slope = (dx as f64 + 0.5) / (dy as f64 - 0.5);
      if start < r_slope {
        continue;
      }
      if end > l_slope {
        break;
      }

      let p = origin + octant_offset(octant, dx, dy);
      if metric.within(origin, p, radius) {
        ignite(p);
      }

      if blocked {
        if is_opaque(p) {
          new_start = r_slope;
        } else {
          blocked = false;
          start = new_start;
        }
      } else if is_opaque(p) && dist < radius {
        // A wall splits the sector: recurse for the part above it and
        // narrow this scan to the part below.
        blocked = true;
        cast(
          origin,
          radius,
          metric,
          octant,
          dist + 1,
          start,
          l_slope,
          is_opaque,
          ignite,
        );
        new_start = r_slope;
      }
    }
    if blocked {
      return;
    }
  }
}
