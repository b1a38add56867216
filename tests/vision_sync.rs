//! End-to-end tests for the visibility synchronization machinery, driven
//! through a probe policy that records every effect it applies.

use std::cell::RefCell;
use std::rc::Rc;

use lantern::geo::Metric;
use lantern::geo::Point;
use lantern::gfx::texel::Texel;
use lantern::map::Entity;
use lantern::map::Level;
use lantern::map::Tile;
use lantern::vision::SyncState;
use lantern::vision::VisionPolicy;
use lantern::vision::VisionSync;

struct ProbeTile {
  lit: bool,
}

impl Tile for ProbeTile {
  fn blocks_sight(&self) -> bool {
    false
  }
}

#[derive(Default)]
struct Tally {
  terrain_seen: usize,
  terrain_unseen: usize,
  entity_seen: usize,
  entity_unseen: usize,
}

impl Tally {
  fn clear(&mut self) {
    *self = Tally::default();
  }
}

/// Counts every effect and keeps a `lit` flag per tile, so tests can check
/// both how often effects ran and what visual state they left behind.
struct Probe {
  tally: Rc<RefCell<Tally>>,
}

impl VisionPolicy<ProbeTile> for Probe {
  fn terrain_seen(&mut self, cell: &mut ProbeTile, _pos: Point) -> bool {
    self.tally.borrow_mut().terrain_seen += 1;
    let changed = !cell.lit;
    cell.lit = true;
    changed
  }

  fn terrain_unseen(
    &mut self,
    cell: &mut ProbeTile,
    _pos: Point,
    _explored: bool,
  ) -> bool {
    self.tally.borrow_mut().terrain_unseen += 1;
    let changed = cell.lit;
    cell.lit = false;
    changed
  }

  fn entity_seen(&mut self, entity: &mut Entity) -> bool {
    self.tally.borrow_mut().entity_seen += 1;
    let texel = entity.texel.with_visible(true);
    let changed = texel != entity.texel;
    entity.texel = texel;
    changed
  }

  fn entity_unseen(&mut self, entity: &mut Entity, _explored: bool) -> bool {
    self.tally.borrow_mut().entity_unseen += 1;
    let texel = entity.texel.with_visible(false);
    let changed = texel != entity.texel;
    entity.texel = texel;
    changed
  }
}

fn open_level(width: i32, height: i32) -> Level<ProbeTile> {
  let mut lvl = Level::new(width, height);
  for p in lvl.bounds().points() {
    lvl.set_terrain(p, ProbeTile { lit: false });
  }
  lvl
}

fn probe() -> (Rc<RefCell<Tally>>, VisionSync<ProbeTile>) {
  let tally = Rc::new(RefCell::new(Tally::default()));
  let sync = VisionSync::new(Probe {
    tally: Rc::clone(&tally),
  });
  (tally, sync)
}

/// Every tile's stored visual state matches its membership in the current
/// visible set.
fn assert_coverage(lvl: &Level<ProbeTile>) {
  for p in lvl.bounds().points() {
    let lit = lvl.terrain(p).expect("full level").lit;
    assert_eq!(
      lit,
      lvl.fov().sees(p),
      "tile at ({}, {}) disagrees with the fov",
      p.x,
      p.y
    );
  }
}

#[test]
fn column_shift_marks_exactly_the_edges() {
  let mut lvl = open_level(30, 30);
  let (tally, sync) = probe();
  lvl.attach(sync).unwrap();

  lvl.recalculate_fov(Point::new(15, 15), 5, Metric::Chebyshev);
  assert_coverage(&lvl);
  tally.borrow_mut().clear();

  // Recentering one column to the right: one column enters the view, the
  // trailing column leaves it.
  lvl.recalculate_fov(Point::new(16, 15), 5, Metric::Chebyshev);
  assert_eq!(tally.borrow().terrain_seen, 11);
  assert_eq!(tally.borrow().terrain_unseen, 11);
  assert_coverage(&lvl);

  // Each from-scratch recomputation starts a fresh unseen-tracking epoch,
  // so a further step darkens its own trailing column, not last epoch's.
  tally.borrow_mut().clear();
  lvl.recalculate_fov(Point::new(17, 15), 5, Metric::Chebyshev);
  assert_eq!(tally.borrow().terrain_seen, 11);
  assert_eq!(tally.borrow().terrain_unseen, 11);
  assert_coverage(&lvl);
}

#[test]
fn repaint_all_visible_covers_every_visible_point() {
  let mut lvl = open_level(30, 30);
  let (tally, sync) = probe();
  lvl.attach(sync.repaint_all_visible(true)).unwrap();

  lvl.recalculate_fov(Point::new(15, 15), 5, Metric::Chebyshev);
  tally.borrow_mut().clear();

  lvl.recalculate_fov(Point::new(16, 15), 5, Metric::Chebyshev);
  assert_eq!(
    tally.borrow().terrain_seen,
    lvl.fov().visible().len(),
    "the whole view repaints, not just the delta"
  );
  assert_eq!(tally.borrow().terrain_unseen, 11);
  assert_coverage(&lvl);
}

#[test]
fn reveal_all_attach_sweeps_everything_exactly_once() {
  let mut lvl = open_level(4, 3);
  lvl.spawn(Point::new(1, 1), Texel::new('a'));
  lvl.spawn(Point::new(2, 2), Texel::new('b'));

  let tally = Rc::new(RefCell::new(Tally::default()));
  lvl
    .attach(VisionSync::with_state(
      Probe {
        tally: Rc::clone(&tally),
      },
      SyncState::DisabledRevealAll,
    ))
    .unwrap();

  assert_eq!(tally.borrow().terrain_seen, 12);
  assert_eq!(tally.borrow().entity_seen, 2);
  assert_eq!(tally.borrow().terrain_unseen, 0);
  assert_eq!(tally.borrow().entity_unseen, 0);
}

#[test]
fn frozen_attach_touches_nothing() {
  let mut lvl = open_level(4, 3);
  let tally = Rc::new(RefCell::new(Tally::default()));
  lvl
    .attach(VisionSync::with_state(
      Probe {
        tally: Rc::clone(&tally),
      },
      SyncState::DisabledFrozen,
    ))
    .unwrap();
  assert_eq!(tally.borrow().terrain_seen, 0);
  assert_eq!(tally.borrow().terrain_unseen, 0);
}

#[test]
fn enabled_attach_classifies_by_current_visibility() {
  let mut lvl = open_level(10, 10);
  // Establish a view before any handler exists.
  lvl.recalculate_fov(Point::new(2, 2), 1, Metric::Chebyshev);

  let (tally, sync) = probe();
  lvl.attach(sync).unwrap();
  assert_eq!(tally.borrow().terrain_seen, 9, "the 3x3 visible block");
  assert_eq!(tally.borrow().terrain_unseen, 91);
  assert_coverage(&lvl);
}

#[test]
fn redundant_state_change_is_a_no_op() {
  let mut lvl = open_level(6, 6);
  let (tally, sync) = probe();
  lvl.attach(sync).unwrap();
  tally.borrow_mut().clear();

  assert!(lvl.set_vision_state(SyncState::Enabled));
  assert_eq!(tally.borrow().terrain_seen, 0);
  assert_eq!(tally.borrow().terrain_unseen, 0);
}

#[test]
fn state_changes_sweep_and_detached_levels_report_none() {
  let mut lvl = open_level(6, 6);
  assert!(!lvl.set_vision_state(SyncState::DisabledRevealAll));
  assert_eq!(lvl.vision_state(), None);

  let (tally, sync) = probe();
  lvl.attach(sync).unwrap();
  tally.borrow_mut().clear();

  assert!(lvl.set_vision_state(SyncState::DisabledRevealAll));
  assert_eq!(lvl.vision_state(), Some(SyncState::DisabledRevealAll));
  assert_eq!(tally.borrow().terrain_seen, 36);
}

#[test]
fn detached_state_store_sweeps_on_attach() {
  let mut lvl = open_level(4, 4);
  let tally = Rc::new(RefCell::new(Tally::default()));
  let mut sync = VisionSync::new(Probe {
    tally: Rc::clone(&tally),
  });
  sync.set_state(SyncState::DisabledRevealAll);
  lvl.attach(sync).unwrap();
  assert_eq!(tally.borrow().terrain_seen, 16);
  assert_eq!(tally.borrow().terrain_unseen, 0);
}

#[test]
fn disabled_handler_ignores_recalculation() {
  let mut lvl = open_level(12, 12);
  let (tally, sync) = probe();
  lvl.attach(sync).unwrap();
  lvl.recalculate_fov(Point::new(3, 3), 2, Metric::Chebyshev);
  lvl.set_vision_state(SyncState::DisabledFrozen);
  tally.borrow_mut().clear();

  lvl.recalculate_fov(Point::new(8, 8), 2, Metric::Chebyshev);
  lvl.spawn(Point::new(8, 8), Texel::new('g'));
  assert_eq!(tally.borrow().terrain_seen, 0);
  assert_eq!(tally.borrow().terrain_unseen, 0);
  assert_eq!(tally.borrow().entity_seen, 0);
}

#[test]
fn removal_restores_seen_in_any_state() {
  let mut lvl = open_level(12, 12);
  let (tally, sync) = probe();
  lvl.attach(sync).unwrap();

  // The creature stands outside the view, so it gets hidden.
  let id = lvl.spawn(Point::new(10, 10), Texel::new('K'));
  lvl.recalculate_fov(Point::new(2, 2), 2, Metric::Chebyshev);
  assert!(!lvl.entity(id).unwrap().texel.is_visible());

  // Even a frozen handler must undo the decoration on removal, or the
  // entity would be reused elsewhere pre-hidden.
  lvl.set_vision_state(SyncState::DisabledFrozen);
  tally.borrow_mut().clear();
  let ent = lvl.despawn(id).unwrap();
  assert_eq!(tally.borrow().entity_seen, 1);
  assert!(ent.texel.is_visible());
}

#[test]
fn removed_terrain_comes_back_seen() {
  let mut lvl = open_level(8, 8);
  let (_tally, sync) = probe();
  lvl.attach(sync).unwrap();
  lvl.recalculate_fov(Point::new(1, 1), 1, Metric::Chebyshev);

  let far = Point::new(6, 6);
  assert!(!lvl.terrain(far).unwrap().lit);
  let cell = lvl.remove_terrain(far).unwrap();
  assert!(cell.lit, "removal restored the seen appearance");
}

#[test]
fn added_objects_are_classified_immediately() {
  let mut lvl = open_level(12, 12);
  let (_tally, sync) = probe();
  lvl.attach(sync).unwrap();
  lvl.recalculate_fov(Point::new(3, 3), 2, Metric::Chebyshev);

  let near = lvl.spawn(Point::new(4, 4), Texel::new('n'));
  let far = lvl.spawn(Point::new(10, 10), Texel::new('f'));
  assert!(lvl.entity(near).unwrap().texel.is_visible());
  assert!(!lvl.entity(far).unwrap().texel.is_visible());

  // Moving is classified against the new position only.
  lvl.move_entity(far, Point::new(3, 4));
  assert!(lvl.entity(far).unwrap().texel.is_visible());
  lvl.move_entity(near, Point::new(10, 10));
  assert!(!lvl.entity(near).unwrap().texel.is_visible());

  // Fresh terrain gets the same treatment.
  let in_view = Point::new(2, 3);
  lvl.set_terrain(in_view, ProbeTile { lit: false });
  assert!(lvl.terrain(in_view).unwrap().lit);
}

#[test]
fn explored_only_grows() {
  let mut lvl = open_level(30, 30);
  let (_tally, sync) = probe();
  lvl.attach(sync).unwrap();

  lvl.recalculate_fov(Point::new(5, 5), 3, Metric::Chebyshev);
  let explored: Vec<Point> = lvl
    .bounds()
    .points()
    .filter(|&p| lvl.explored(p))
    .collect();
  assert_eq!(explored.len(), 49);

  lvl.recalculate_fov(Point::new(25, 25), 3, Metric::Chebyshev);
  for p in explored {
    assert!(lvl.explored(p), "({}, {}) forgot it was explored", p.x, p.y);
  }
}

#[test]
fn append_revives_points_that_return_to_view() {
  let mut lvl = open_level(30, 30);
  let (tally, sync) = probe();
  lvl.attach(sync).unwrap();

  lvl.recalculate_fov(Point::new(15, 15), 5, Metric::Chebyshev);
  lvl.recalculate_fov(Point::new(16, 15), 5, Metric::Chebyshev);
  // The trailing column is dark now.
  assert!(!lvl.terrain(Point::new(10, 15)).unwrap().lit);
  tally.borrow_mut().clear();

  // A second observer whose view covers the trailing column again. The
  // handler must revert exactly those tracked points back to seen, and
  // darken nothing.
  lvl.append_fov(Point::new(12, 15), 5, Metric::Chebyshev);
  assert_eq!(tally.borrow().terrain_unseen, 0);
  assert!(lvl.terrain(Point::new(10, 15)).unwrap().lit);
  assert_coverage(&lvl);
}

#[test]
fn append_darkens_each_point_once() {
  let mut lvl = open_level(40, 30);
  let (tally, sync) = probe();
  lvl.attach(sync).unwrap();

  // One wide epoch, then two appends that both leave the same trailing
  // region dark: the second append must not darken it again.
  lvl.recalculate_fov(Point::new(15, 15), 5, Metric::Chebyshev);
  lvl.recalculate_fov(Point::new(20, 15), 5, Metric::Chebyshev);
  let first_unseen = tally.borrow().terrain_unseen;
  assert!(first_unseen > 0);

  lvl.append_fov(Point::new(22, 15), 5, Metric::Chebyshev);
  let after_append = tally.borrow().terrain_unseen;
  assert_eq!(
    after_append, first_unseen,
    "already-tracked points were darkened again"
  );
  assert_coverage(&lvl);
}

#[test]
fn detach_hands_back_an_undecorated_level() {
  let mut lvl = open_level(10, 10);
  let (_tally, sync) = probe();
  lvl.attach(sync).unwrap();
  lvl.recalculate_fov(Point::new(2, 2), 2, Metric::Chebyshev);
  let id = lvl.spawn(Point::new(8, 8), Texel::new('K'));
  assert!(!lvl.entity(id).unwrap().texel.is_visible());

  let sync = lvl.detach().expect("was attached");
  assert_eq!(sync.state(), SyncState::Enabled);
  for p in lvl.bounds().points() {
    assert!(lvl.terrain(p).unwrap().lit);
  }
  assert!(lvl.entity(id).unwrap().texel.is_visible());
}

#[test]
fn missing_terrain_is_skipped_silently() {
  let mut lvl: Level<ProbeTile> = Level::new(10, 10);
  // Only a sparse cross of tiles; everything else is a hole.
  for &p in &[Point::new(5, 5), Point::new(5, 6), Point::new(6, 5)] {
    lvl.set_terrain(p, ProbeTile { lit: false });
  }
  let (tally, sync) = probe();
  lvl.attach(sync).unwrap();
  assert_eq!(
    tally.borrow().terrain_seen + tally.borrow().terrain_unseen,
    3,
    "holes are not an error and not an effect"
  );

  lvl.recalculate_fov(Point::new(5, 5), 2, Metric::Chebyshev);
  assert!(lvl.terrain(Point::new(5, 5)).unwrap().lit);
}
