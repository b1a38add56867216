//! Remembered appearances for explored terrain.
//!
//! The classic roguelike "map memory": while a tile is in view the player
//! sees its true appearance, and mutations to it show up live; once the
//! tile falls out of view its last-seen appearance freezes, restyled by a
//! [`MemoryStyle`] (dimmed, usually), and stays frozen no matter what
//! happens to the real tile — until it is seen again, at which point it
//! snaps to the current truth.
//!
//! Entities are not remembered: out of view they are simply hidden.

use crate::geo::Point;
use crate::gfx::texel::Rgb;
use crate::gfx::texel::Texel;
use crate::map::Entity;
use crate::map::Tile;
use crate::vision::VisionPolicy;

/// Terrain with a dual appearance record.
///
/// `truth` is the authoritative appearance, owned by game logic and free to
/// change at any time. `remembered` is what renderers draw. The `live_sync`
/// flag is the subscription tying the two together: while it is set,
/// [`set_truth()`] mirrors every change into `remembered`; while clear,
/// `remembered` is frozen. Only the attached vision handler toggles the
/// flag.
///
/// A policy that requires this trait can only be attached to a level whose
/// terrain implements it, so there is no misconfigured-at-runtime case to
/// handle.
///
/// [`set_truth()`]: MemoryCell::set_truth
pub trait MemoryCell {
  /// Returns the authoritative appearance.
  fn truth(&self) -> Texel;

  /// Returns the rendered appearance.
  fn remembered(&self) -> Texel;

  /// Returns the rendered appearance for mutation.
  fn remembered_mut(&mut self) -> &mut Texel;

  /// Returns whether truth changes currently propagate to `remembered`.
  fn live_sync(&self) -> bool;

  /// Sets or clears the live-sync subscription. Setting an already-set
  /// flag is harmless.
  fn set_live_sync(&mut self, on: bool);

  /// Replaces the authoritative appearance, mirroring it into `remembered`
  /// when live sync is on. Returns whether the *rendered* appearance
  /// changed.
  fn set_truth(&mut self, texel: Texel) -> bool;
}

/// How an explored point looks from memory.
///
/// The transform receives the frozen last-seen appearance and returns what
/// to render in its place. It runs once per unseen transition; the handler
/// never applies it to an appearance that is already a memory.
pub trait MemoryStyle {
  fn remember(&self, texel: Texel) -> Texel;
}

/// Scales remembered colors toward black.
pub struct Dim(pub f32);

impl MemoryStyle for Dim {
  fn remember(&self, texel: Texel) -> Texel {
    texel.dimmed(self.0)
  }
}

/// Recolors memories to a single foreground.
pub struct Flat(pub Rgb);

impl MemoryStyle for Flat {
  fn remember(&self, texel: Texel) -> Texel {
    texel.with_fg(self.0)
  }
}

/// A ready-made dual-appearance terrain cell.
#[derive(Clone, Debug)]
pub struct MemoryTile {
  truth: Texel,
  remembered: Texel,
  live_sync: bool,
  opaque: bool,
  solid: bool,
}

impl MemoryTile {
  /// Creates a transparent, walkable cell looking like `truth`.
  pub fn new(truth: Texel) -> MemoryTile {
    MemoryTile {
      truth,
      remembered: truth,
      live_sync: false,
      opaque: false,
      solid: false,
    }
  }

  /// Returns a copy of this cell that blocks sight.
  pub fn with_opaque(mut self, opaque: bool) -> MemoryTile {
    self.opaque = opaque;
    self
  }

  /// Returns a copy of this cell that blocks movement.
  pub fn with_solid(mut self, solid: bool) -> MemoryTile {
    self.solid = solid;
    self
  }

  /// Returns whether this cell blocks movement.
  pub fn is_solid(&self) -> bool {
    self.solid
  }
}

impl Tile for MemoryTile {
  fn blocks_sight(&self) -> bool {
    self.opaque
  }
}

impl MemoryCell for MemoryTile {
  fn truth(&self) -> Texel {
    self.truth
  }

  fn remembered(&self) -> Texel {
    self.remembered
  }

  fn remembered_mut(&mut self) -> &mut Texel {
    &mut self.remembered
  }

  fn live_sync(&self) -> bool {
    self.live_sync
  }

  fn set_live_sync(&mut self, on: bool) {
    self.live_sync = on;
  }

  fn set_truth(&mut self, texel: Texel) -> bool {
    self.truth = texel;
    if self.live_sync && self.remembered != texel {
      self.remembered = texel;
      return true;
    }
    false
  }
}

/// Vision effects for dual-appearance terrain.
///
/// In view, the remembered appearance shadows the truth. Out of view it
/// freezes: restyled by `S` if the point was ever explored, hidden
/// outright if not.
pub struct MemoryPolicy<S> {
  style: S,
}

impl<S> MemoryPolicy<S> {
  pub fn new(style: S) -> MemoryPolicy<S> {
    MemoryPolicy { style }
  }
}

impl<C: MemoryCell, S: MemoryStyle> VisionPolicy<C> for MemoryPolicy<S> {
  fn terrain_seen(&mut self, cell: &mut C, _pos: Point) -> bool {
    // Snap rather than animate: any stale decoration disappears at once,
    // visibility flag included.
    let truth = cell.truth();
    let changed = cell.remembered() != truth;
    if changed {
      *cell.remembered_mut() = truth;
    }
    cell.set_live_sync(true);
    changed
  }

  fn terrain_unseen(&mut self, cell: &mut C, _pos: Point, explored: bool)
    -> bool {
    // Stop live propagation before freezing anything.
    cell.set_live_sync(false);
    let before = cell.remembered();
    let after = if explored {
      if before.is_memory() {
        // Already frozen and styled; styling again would compound.
        return false;
      }
      self.style.remember(before).with_memory(true)
    } else {
      // Never explored: there is nothing to remember.
      before.with_visible(false)
    };
    if after != before {
      *cell.remembered_mut() = after;
      return true;
    }
    false
  }

  fn entity_seen(&mut self, entity: &mut Entity) -> bool {
    let texel = entity.texel.with_visible(true);
    let changed = texel != entity.texel;
    entity.texel = texel;
    changed
  }

  fn entity_unseen(&mut self, entity: &mut Entity, _explored: bool) -> bool {
    let texel = entity.texel.with_visible(false);
    let changed = texel != entity.texel;
    entity.texel = texel;
    changed
  }
}
