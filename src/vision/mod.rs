//! Keeps rendered appearances synchronized with a level's field of view.
//!
//! A [`VisionSync`] sits on a [`Level`] and reacts to the level's lifecycle
//! and field-of-view events, driving a pluggable [`VisionPolicy`] that says
//! what "seen" and "unseen" actually look like. The handler decides *when*
//! an effect applies; the policy decides *what* it does. [`memory`] supplies
//! the policy most games want: unseen-but-explored terrain keeps a frozen,
//! restyled copy of its last-seen appearance.
//!
//! The update is incremental. After each recomputation only the points that
//! changed visibility are touched, and a tracked set of already-darkened
//! points keeps repeated additive recomputations from darkening a point
//! twice — or, when an appended view covers such a point again, turns it
//! back to seen.

use std::collections::HashSet;

use crate::geo::Point;
use crate::map::Entity;
use crate::map::EntityId;
use crate::map::Level;

pub mod memory;

/// What a [`VisionSync`] currently does with events.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SyncState {
  /// React to every event, keeping appearances matched to the view.
  Enabled,
  /// Reveal everything once, then stop reacting.
  DisabledRevealAll,
  /// Stop reacting and leave appearances exactly as they are.
  DisabledFrozen,
}

/// The visual effect a [`VisionSync`] applies.
///
/// Implementations must be idempotent — applying the same effect to the
/// same object twice must look the same as applying it once — and must not
/// assume anything about the object's prior appearance. Each method returns
/// whether it changed the rendered appearance; the handler uses the report
/// to mark dirty points for the renderer.
pub trait VisionPolicy<T> {
  /// Puts a terrain cell in its in-view appearance.
  fn terrain_seen(&mut self, cell: &mut T, pos: Point) -> bool;

  /// Puts a terrain cell in its out-of-view appearance. `explored` tells
  /// the policy whether the observer has ever seen this point.
  fn terrain_unseen(&mut self, cell: &mut T, pos: Point, explored: bool)
    -> bool;

  /// Puts an entity in its in-view appearance.
  fn entity_seen(&mut self, entity: &mut Entity) -> bool;

  /// Puts an entity in its out-of-view appearance.
  fn entity_unseen(&mut self, entity: &mut Entity, explored: bool) -> bool;
}

/// Synchronizes a level's appearances with its field of view.
///
/// Seat one on a level with [`Level::attach()`]; there can be at most one
/// per level. While seated, the handler is driven by the level itself —
/// every reaction completes before the mutating call that triggered it
/// returns.
pub struct VisionSync<T> {
  state: SyncState,
  repaint_all: bool,
  tracked_unseen: HashSet<Point>,
  policy: Box<dyn VisionPolicy<T>>,
}

impl<T> VisionSync<T> {
  /// Creates an enabled handler driving `policy`.
  pub fn new(policy: impl VisionPolicy<T> + 'static) -> VisionSync<T> {
    Self::with_state(policy, SyncState::Enabled)
  }

  /// Creates a handler in the given state.
  pub fn with_state(
    policy: impl VisionPolicy<T> + 'static,
    state: SyncState,
  ) -> VisionSync<T> {
    VisionSync {
      state,
      repaint_all: false,
      tracked_unseen: HashSet::new(),
      policy: Box::new(policy),
    }
  }

  /// When set, every recomputation repaints all currently visible points
  /// instead of only the newly seen ones. Useful for policies whose seen
  /// appearance depends on something that changes between recomputations,
  /// such as distance to the observer.
  pub fn repaint_all_visible(mut self, on: bool) -> VisionSync<T> {
    self.repaint_all = on;
    self
  }

  /// Returns this handler's state.
  pub fn state(&self) -> SyncState {
    self.state
  }

  /// Stores a new state on a detached handler.
  ///
  /// The accompanying sweep happens when the handler is attached; a seated
  /// handler changes state through [`Level::set_vision_state()`].
  pub fn set_state(&mut self, state: SyncState) {
    self.state = state;
  }

  pub(crate) fn attached(&mut self, lvl: &mut Level<T>) {
    self.sweep(lvl, self.state);
  }

  pub(crate) fn detached(&mut self, lvl: &mut Level<T>) {
    // Hand the level back undecorated, unless everything is already
    // revealed.
    if self.state != SyncState::DisabledRevealAll {
      self.sweep(lvl, SyncState::DisabledRevealAll);
    }
  }

  pub(crate) fn apply_state(&mut self, lvl: &mut Level<T>, state: SyncState) {
    if state == self.state {
      return;
    }
    log::debug!("vision state {:?} -> {:?}", self.state, state);
    self.state = state;
    self.sweep(lvl, state);
  }

  pub(crate) fn terrain_added(&mut self, lvl: &mut Level<T>, p: Point) {
    if self.state != SyncState::Enabled {
      return;
    }
    if lvl.fov().sees(p) {
      self.seen_terrain_at(lvl, p);
    } else {
      self.unseen_terrain_at(lvl, p);
    }
  }

  pub(crate) fn entity_added(&mut self, lvl: &mut Level<T>, id: EntityId) {
    if self.state != SyncState::Enabled {
      return;
    }
    self.classify_entity(lvl, id);
  }

  pub(crate) fn entity_moved(&mut self, lvl: &mut Level<T>, id: EntityId) {
    // Only the new position matters; terrain cannot move.
    if self.state != SyncState::Enabled {
      return;
    }
    self.classify_entity(lvl, id);
  }

  // Removal always restores the seen appearance, in every state: whatever
  // decoration was applied while the object was on the map must be undone,
  // or a reused object would show up pre-darkened somewhere else.
  pub(crate) fn terrain_removed(&mut self, cell: &mut T, pos: Point) {
    let _ = self.policy.terrain_seen(cell, pos);
  }

  pub(crate) fn entity_removed(&mut self, entity: &mut Entity) {
    let _ = self.policy.entity_seen(entity);
  }

  // Bookkeeping, not an appearance effect: runs in every state, so a
  // handler re-enabled after a reset never reconciles against a stale
  // tracked set.
  pub(crate) fn visibility_reset(&mut self) {
    self.tracked_unseen.clear();
  }

  pub(crate) fn recalculated(&mut self, lvl: &mut Level<T>) {
    if self.state != SyncState::Enabled {
      return;
    }

    // Every seen effect runs before any unseen effect. The two deltas are
    // disjoint point sets, but a moving observer's recomputation can touch
    // the same entity through both phases; running them in this order
    // leaves it seen.
    let pts: Vec<Point> = if self.repaint_all {
      lvl.fov().visible().iter().copied().collect()
    } else {
      lvl.fov().newly_seen().collect()
    };
    for p in pts {
      self.seen_terrain_at(lvl, p);
      self.seen_entities_at(lvl, p);
    }

    let unseen: HashSet<Point> = lvl.fov().newly_unseen().collect();
    if self.tracked_unseen.is_empty() {
      // First recomputation of this epoch: darken everything that fell out
      // of view.
      for &p in &unseen {
        self.unseen_terrain_at(lvl, p);
        self.unseen_entities_at(lvl, p);
      }
    } else {
      // An appended view can cover points we already darkened this epoch;
      // those come back to seen. Points newly fallen out get darkened once.
      let back: Vec<Point> =
        self.tracked_unseen.difference(&unseen).copied().collect();
      for p in back {
        self.seen_terrain_at(lvl, p);
        self.seen_entities_at(lvl, p);
      }
      let fresh: Vec<Point> =
        unseen.difference(&self.tracked_unseen).copied().collect();
      for p in fresh {
        self.unseen_terrain_at(lvl, p);
        self.unseen_entities_at(lvl, p);
      }
    }
    self.tracked_unseen = unseen;
  }

  // One full-map pass, applied on attach and on state changes.
  fn sweep(&mut self, lvl: &mut Level<T>, mode: SyncState) {
    match mode {
      SyncState::DisabledFrozen => {}
      SyncState::DisabledRevealAll => {
        for p in lvl.positions().collect::<Vec<_>>() {
          self.seen_terrain_at(lvl, p);
        }
        let ids: Vec<(EntityId, Point)> =
          lvl.entities().map(|(id, e)| (id, e.pos)).collect();
        for (id, pos) in ids {
          self.seen_entity(lvl, id, pos);
        }
      }
      SyncState::Enabled => {
        for p in lvl.positions().collect::<Vec<_>>() {
          if lvl.fov().sees(p) {
            self.seen_terrain_at(lvl, p);
          } else {
            self.unseen_terrain_at(lvl, p);
          }
        }
        let ids: Vec<EntityId> = lvl.entities().map(|(id, _)| id).collect();
        for id in ids {
          self.classify_entity(lvl, id);
        }
      }
    }
  }

  fn classify_entity(&mut self, lvl: &mut Level<T>, id: EntityId) {
    let pos = match lvl.entity(id) {
      Some(e) => e.pos,
      None => return,
    };
    if lvl.fov().sees(pos) {
      self.seen_entity(lvl, id, pos);
    } else {
      self.unseen_entity(lvl, id, pos);
    }
  }

  // Missing terrain at a point is not an error; there is just nothing to
  // restyle.
  fn seen_terrain_at(&mut self, lvl: &mut Level<T>, p: Point) {
    let policy = &mut self.policy;
    let changed = match lvl.terrain_mut(p) {
      Some(cell) => policy.terrain_seen(cell, p),
      None => false,
    };
    if changed {
      lvl.mark_dirty(p);
    }
  }

  fn unseen_terrain_at(&mut self, lvl: &mut Level<T>, p: Point) {
    let explored = lvl.explored(p);
    let policy = &mut self.policy;
    let changed = match lvl.terrain_mut(p) {
      Some(cell) => policy.terrain_unseen(cell, p, explored),
      None => false,
    };
    if changed {
      lvl.mark_dirty(p);
    }
  }

  fn seen_entities_at(&mut self, lvl: &mut Level<T>, p: Point) {
    let ids: Vec<EntityId> = lvl.entities_at(p).collect();
    for id in ids {
      self.seen_entity(lvl, id, p);
    }
  }

  fn unseen_entities_at(&mut self, lvl: &mut Level<T>, p: Point) {
    let ids: Vec<EntityId> = lvl.entities_at(p).collect();
    for id in ids {
      self.unseen_entity(lvl, id, p);
    }
  }

  fn seen_entity(&mut self, lvl: &mut Level<T>, id: EntityId, pos: Point) {
    let policy = &mut self.policy;
    let changed = match lvl.entity_mut(id) {
      Some(e) => policy.entity_seen(e),
      None => false,
    };
    if changed {
      lvl.mark_dirty(pos);
    }
  }

  fn unseen_entity(&mut self, lvl: &mut Level<T>, id: EntityId, pos: Point) {
    let explored = lvl.explored(pos);
    let policy = &mut self.policy;
    let changed = match lvl.entity_mut(id) {
      Some(e) => policy.entity_unseen(e, explored),
      None => false,
    };
    if changed {
      lvl.mark_dirty(pos);
    }
  }
}
