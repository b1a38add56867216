//! Levels: a terrain grid, the entities standing on it, and the seat for a
//! vision handler.
//!
//! A [`Level`] owns everything the visibility machinery touches: terrain
//! cells, entities with a spatial index, the player [`Fov`], the persistent
//! [`Explored`] record, and a dirty-point set that renderers drain with
//! [`Level::take_dirty()`]. Every mutation that the attached
//! [`VisionSync`] cares about dispatches to it synchronously, before the
//! mutating call returns.
//!
//! [`VisionSync`]: crate::vision::VisionSync

use std::collections::HashMap;
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::mem;

use crate::fov::Fov;
use crate::geo::Metric;
use crate::geo::Point;
use crate::geo::Rect;
use crate::gfx::texel::Texel;
use crate::vision::SyncState;
use crate::vision::VisionSync;

mod explored;

pub use self::explored::Explored;

/// Terrain cells a level can compute sight through.
pub trait Tile {
  /// Whether this cell blocks line of sight.
  fn blocks_sight(&self) -> bool;
}

/// Identifies an entity within its level.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct EntityId(u64);

/// A movable map object.
///
/// Terrain cannot move and there is at most one cell per point; entities can
/// move and any number of them may share a point. `pos` is maintained by the
/// level — use [`Level::move_entity()`] to change it.
#[derive(Clone, Debug)]
pub struct Entity {
  pub pos: Point,
  pub texel: Texel,
}

/// Returned by [`Level::attach()`] when a vision handler is already seated.
///
/// Two handlers would race to apply contradictory appearances, so a level
/// holds at most one; this is a wiring mistake by the integrator, not a
/// runtime condition to recover from. The rejected handler is dropped.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AlreadyAttached;

impl fmt::Display for AlreadyAttached {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "a vision handler is already attached to this level")
  }
}

impl Error for AlreadyAttached {}

fn grid_index(bounds: Rect, p: Point) -> Option<usize> {
  if !bounds.contains(p) {
    return None;
  }
  let rel = p - bounds.upper_left();
  Some((rel.y * bounds.width() + rel.x) as usize)
}

/// A game map: terrain, entities, field of view, exploration record.
pub struct Level<T> {
  bounds: Rect,
  terrain: Box<[Option<T>]>,
  entities: HashMap<EntityId, Entity>,
  by_pos: HashMap<Point, Vec<EntityId>>,
  next_id: u64,
  fov: Fov,
  explored: Explored,
  dirty: HashSet<Point>,
  vision: Option<VisionSync<T>>,
}

impl<T> Level<T> {
  /// Creates an empty level of the given dimensions.
  pub fn new(width: i32, height: i32) -> Level<T> {
    let bounds = Rect::with_dims(width, height);
    Level {
      bounds,
      terrain: (0..bounds.area().max(0)).map(|_| None).collect(),
      entities: HashMap::new(),
      by_pos: HashMap::new(),
      next_id: 0,
      fov: Fov::new(),
      explored: Explored::new(width, height),
      dirty: HashSet::new(),
      vision: None,
    }
  }

  /// Returns this level's bounds.
  pub fn bounds(&self) -> Rect {
    self.bounds
  }

  /// Returns an iterator over every position in the level, with or without
  /// terrain, in row-major order.
  pub fn positions(&self) -> impl Iterator<Item = Point> {
    self.bounds.points()
  }

  /// Returns the terrain cell at `p`, if any.
  pub fn terrain(&self, p: Point) -> Option<&T> {
    self.terrain[grid_index(self.bounds, p)?].as_ref()
  }

  pub(crate) fn terrain_mut(&mut self, p: Point) -> Option<&mut T> {
    self.terrain[grid_index(self.bounds, p)?].as_mut()
  }

  /// Places `cell` at `p`, returning the displaced cell.
  ///
  /// The displaced cell (if any) gets the removal treatment from the
  /// attached handler; the new cell is classified by current visibility.
  /// Out-of-bounds placements are dropped with a warning.
  pub fn set_terrain(&mut self, p: Point, cell: T) -> Option<T> {
    let i = match grid_index(self.bounds, p) {
      Some(i) => i,
      None => {
        log::warn!("terrain placed out of bounds at ({}, {})", p.x, p.y);
        return None;
      }
    };
    let mut old = self.terrain[i].replace(cell);
    if let (Some(cell), Some(sync)) = (old.as_mut(), self.vision.as_mut()) {
      sync.terrain_removed(cell, p);
    }
    self.mark_dirty(p);
    self.with_vision(|v, lvl| v.terrain_added(lvl, p));
    old
  }

  /// Removes and returns the terrain cell at `p`.
  ///
  /// The removed cell always gets its seen appearance back, whatever the
  /// handler state, so it can be reused elsewhere without carrying stale
  /// decoration.
  pub fn remove_terrain(&mut self, p: Point) -> Option<T> {
    let i = grid_index(self.bounds, p)?;
    let mut old = self.terrain[i].take()?;
    if let Some(sync) = self.vision.as_mut() {
      sync.terrain_removed(&mut old, p);
    }
    self.mark_dirty(p);
    Some(old)
  }

  /// Applies `f` to the terrain cell at `p`.
  ///
  /// `f` reports whether it changed the cell's rendered appearance; if so
  /// the point is marked dirty. Returns that report, or `false` when there
  /// is no cell.
  pub fn update_terrain(
    &mut self,
    p: Point,
    f: impl FnOnce(&mut T) -> bool,
  ) -> bool {
    let changed = match self.terrain_mut(p) {
      Some(cell) => f(cell),
      None => false,
    };
    if changed {
      self.mark_dirty(p);
    }
    changed
  }

  /// Adds an entity at `pos` and returns its id.
  pub fn spawn(&mut self, pos: Point, texel: Texel) -> EntityId {
    let id = EntityId(self.next_id);
    self.next_id += 1;
    self.entities.insert(id, Entity { pos, texel });
    self.by_pos.entry(pos).or_default().push(id);
    self.mark_dirty(pos);
    self.with_vision(|v, lvl| v.entity_added(lvl, id));
    id
  }

  /// Removes an entity, returning it.
  ///
  /// As with terrain, removal always restores the seen appearance.
  pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
    let mut ent = self.entities.remove(&id)?;
    if let Some(ids) = self.by_pos.get_mut(&ent.pos) {
      ids.retain(|&e| e != id);
      if ids.is_empty() {
        self.by_pos.remove(&ent.pos);
      }
    }
    self.mark_dirty(ent.pos);
    if let Some(sync) = self.vision.as_mut() {
      sync.entity_removed(&mut ent);
    }
    Some(ent)
  }

  /// Moves an entity to `to`. Returns `false` if there is no such entity.
  pub fn move_entity(&mut self, id: EntityId, to: Point) -> bool {
    let from = match self.entities.get(&id) {
      Some(e) => e.pos,
      None => return false,
    };
    if from == to {
      return true;
    }
    if let Some(ids) = self.by_pos.get_mut(&from) {
      ids.retain(|&e| e != id);
      if ids.is_empty() {
        self.by_pos.remove(&from);
      }
    }
    self.by_pos.entry(to).or_default().push(id);
    if let Some(e) = self.entities.get_mut(&id) {
      e.pos = to;
    }
    self.mark_dirty(from);
    self.mark_dirty(to);
    self.with_vision(|v, lvl| v.entity_moved(lvl, id));
    true
  }

  /// Returns the entity with the given id.
  pub fn entity(&self, id: EntityId) -> Option<&Entity> {
    self.entities.get(&id)
  }

  pub(crate) fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
    self.entities.get_mut(&id)
  }

  /// Returns an iterator over all entities.
  pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
    self.entities.iter().map(|(&id, e)| (id, e))
  }

  /// Returns the ids of the entities standing at `p`.
  pub fn entities_at(&self, p: Point) -> impl Iterator<Item = EntityId> + '_ {
    self.by_pos.get(&p).into_iter().flatten().copied()
  }

  /// Returns whether `p` has ever been inside the field of view.
  pub fn explored(&self, p: Point) -> bool {
    self.explored.contains(p)
  }

  /// Returns the current field-of-view result.
  pub fn fov(&self) -> &Fov {
    &self.fov
  }

  pub(crate) fn mark_dirty(&mut self, p: Point) {
    self.dirty.insert(p);
  }

  /// Drains the set of points whose rendered appearance changed since the
  /// last call. This is the hand-off to whatever draws the level.
  pub fn take_dirty(&mut self) -> HashSet<Point> {
    mem::take(&mut self.dirty)
  }

  /// Seats `sync` as this level's vision handler.
  ///
  /// The handler immediately sweeps the whole level according to its
  /// current state. Fails if a handler is already attached.
  pub fn attach(&mut self, sync: VisionSync<T>) -> Result<(), AlreadyAttached> {
    if self.vision.is_some() {
      return Err(AlreadyAttached);
    }
    log::debug!("vision handler attached in state {:?}", sync.state());
    self.vision = Some(sync);
    self.with_vision(|v, lvl| v.attached(lvl));
    Ok(())
  }

  /// Unseats and returns the vision handler, if one is attached.
  ///
  /// Unless the handler had already revealed everything, the level is swept
  /// back to an undecorated all-seen state so it is safe to reuse without
  /// the handler.
  pub fn detach(&mut self) -> Option<VisionSync<T>> {
    let mut sync = self.vision.take()?;
    sync.detached(self);
    log::debug!("vision handler detached");
    Some(sync)
  }

  /// Changes the attached handler's state, sweeping the level if the state
  /// actually changed. Returns `false` when no handler is attached.
  pub fn set_vision_state(&mut self, state: SyncState) -> bool {
    let attached = self.vision.is_some();
    self.with_vision(|v, lvl| v.apply_state(lvl, state));
    attached
  }

  /// Returns the attached handler's state, if one is attached.
  pub fn vision_state(&self) -> Option<SyncState> {
    self.vision.as_ref().map(|v| v.state())
  }

  // Runs `f` with the handler temporarily taken out of its seat, so it can
  // receive `&mut Level` without aliasing itself.
  fn with_vision(&mut self, f: impl FnOnce(&mut VisionSync<T>, &mut Self)) {
    if let Some(mut sync) = self.vision.take() {
      f(&mut sync, self);
      self.vision = Some(sync);
    }
  }
}

impl<T: Tile> Level<T> {
  /// From-scratch field-of-view recomputation for an observer at `origin`.
  ///
  /// Resets the result (beginning a new epoch for the handler's unseen
  /// tracking), scans, marks newly seen points explored, and dispatches to
  /// the handler — all before returning.
  pub fn recalculate_fov(
    &mut self,
    origin: Point,
    radius: i32,
    metric: Metric,
  ) {
    self.fov.reset();
    if let Some(sync) = self.vision.as_mut() {
      sync.visibility_reset();
    }
    self.scan_fov(origin, radius, metric);
    self.finish_fov();
  }

  /// Additive recomputation: merges another observer's view into the
  /// current result without starting a new epoch.
  pub fn append_fov(&mut self, origin: Point, radius: i32, metric: Metric) {
    self.scan_fov(origin, radius, metric);
    self.finish_fov();
  }

  fn scan_fov(&mut self, origin: Point, radius: i32, metric: Metric) {
    let bounds = self.bounds;
    let terrain = &self.terrain;
    // Missing terrain blocks sight, like the void beyond the map edge.
    let mut is_opaque = |p: Point| match grid_index(bounds, p) {
      Some(i) => terrain[i].as_ref().map(|t| t.blocks_sight()).unwrap_or(true),
      None => true,
    };
    self.fov.calculate_append(origin, radius, metric, &mut is_opaque);
  }

  fn finish_fov(&mut self) {
    let newly: Vec<Point> = self.fov.newly_seen().collect();
    for p in newly {
      self.explored.mark(p);
    }
    self.with_vision(|v, lvl| v.recalculated(lvl));
  }
}
