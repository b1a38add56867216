//! A small dungeon crawl demonstrating the visibility binding.
//!
//! Generates a rooms-and-corridors floor of [`MemoryTile`] terrain, seats a
//! memory-dimming vision handler on it, and lets you walk around with WASD.
//! Everything you see on screen comes out of the level's remembered
//! appearances and dirty set; the demo itself never decides what is
//! visible.

use std::fs;
use std::io::stdout;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context as _;
use anyhow::Result;
use crossterm::cursor;
use crossterm::event;
use crossterm::event::Event;
use crossterm::event::KeyCode;
use crossterm::execute;
use crossterm::queue;
use crossterm::style;
use crossterm::terminal;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::Deserialize;
use structopt::StructOpt;

use lantern::geo::Metric;
use lantern::geo::Point;
use lantern::geo::Rect;
use lantern::gfx::texel::colors;
use lantern::gfx::texel::Rgb;
use lantern::gfx::texel::Texel;
use lantern::map::EntityId;
use lantern::map::Level;
use lantern::vision::memory::Dim;
use lantern::vision::memory::MemoryCell as _;
use lantern::vision::memory::MemoryPolicy;
use lantern::vision::memory::MemoryTile;
use lantern::vision::VisionSync;

#[derive(StructOpt)]
#[structopt(name = "lantern-demo", about = "walk a dungeon, remember it")]
struct Opt {
  /// Path to a RON config file.
  #[structopt(long, parse(from_os_str))]
  config: Option<PathBuf>,

  /// Overrides the dungeon seed.
  #[structopt(long)]
  seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
  width: i32,
  height: i32,
  rooms: u32,
  creatures: u32,
  fov_radius: i32,
  metric: Metric,
  dim: f32,
  seed: Option<u64>,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      width: 72,
      height: 22,
      rooms: 9,
      creatures: 6,
      fov_radius: 8,
      metric: Metric::Chebyshev,
      dim: 0.35,
      seed: None,
    }
  }
}

fn wall() -> MemoryTile {
  MemoryTile::new(Texel::new('#').with_fg(colors::LIGHTGRAY))
    .with_opaque(true)
    .with_solid(true)
}

fn floor() -> MemoryTile {
  MemoryTile::new(Texel::new('.').with_fg(colors::GRAY))
}

fn generate(
  cfg: &Config,
  rng: &mut StdRng,
) -> (Level<MemoryTile>, Vec<Rect>) {
  let mut level = Level::new(cfg.width, cfg.height);
  for p in level.bounds().points() {
    level.set_terrain(p, wall());
  }

  let mut rooms: Vec<Rect> = Vec::new();
  for _ in 0..cfg.rooms * 4 {
    if rooms.len() as u32 >= cfg.rooms {
      break;
    }
    let w = rng.gen_range(5..11);
    let h = rng.gen_range(4..7);
    let x = rng.gen_range(1..cfg.width - w - 1);
    let y = rng.gen_range(1..cfg.height - h - 1);
    let room = Rect::new(Point::new(x, y), Point::new(x + w, y + h));
    if rooms.iter().any(|r| r.intersect(room).is_some()) {
      continue;
    }

    // Interior only; the surrounding wall ring stays.
    let interior = Rect::new(
      room.upper_left() + Point::new(1, 1),
      room.lower_right() - Point::new(1, 1),
    );
    for p in interior.points() {
      level.set_terrain(p, floor());
    }

    if let Some(prev) = rooms.last() {
      carve_corridor(&mut level, prev.center(), room.center(), rng);
    }
    rooms.push(room);
  }

  (level, rooms)
}

fn carve_corridor(
  level: &mut Level<MemoryTile>,
  from: Point,
  to: Point,
  rng: &mut StdRng,
) {
  let elbow = if rng.gen_bool(0.5) {
    Point::new(to.x, from.y)
  } else {
    Point::new(from.x, to.y)
  };
  for leg in &[(from, elbow), (elbow, to)] {
    let (a, b) = *leg;
    let step = Point::new((b.x - a.x).signum(), (b.y - a.y).signum());
    let mut p = a;
    loop {
      level.set_terrain(p, floor());
      if p == b {
        break;
      }
      p += step;
    }
  }
}

fn term_color(c: Rgb) -> style::Color {
  style::Color::Rgb {
    r: c.red,
    g: c.green,
    b: c.blue,
  }
}

/// Picks what to draw at `p`: the topmost visible entity, else the
/// remembered terrain appearance, else nothing.
fn cell_texel(level: &Level<MemoryTile>, p: Point) -> Option<Texel> {
  let mut top = None;
  for id in level.entities_at(p) {
    if let Some(e) = level.entity(id) {
      if e.texel.is_visible() {
        top = Some(e.texel);
      }
    }
  }
  if top.is_some() {
    return top;
  }
  let remembered = level.terrain(p)?.remembered();
  if remembered.is_visible() {
    Some(remembered)
  } else {
    None
  }
}

fn draw_cell(
  out: &mut impl Write,
  level: &Level<MemoryTile>,
  p: Point,
) -> Result<()> {
  queue!(out, cursor::MoveTo(p.x as u16, p.y as u16))?;
  match cell_texel(level, p) {
    Some(t) => queue!(
      out,
      style::SetForegroundColor(term_color(t.fg())),
      style::SetBackgroundColor(term_color(t.bg())),
      style::Print(t.glyph())
    )?,
    None => queue!(
      out,
      style::SetBackgroundColor(style::Color::Black),
      style::Print(' ')
    )?,
  }
  Ok(())
}

fn draw_status(
  out: &mut impl Write,
  level: &Level<MemoryTile>,
  player: EntityId,
) -> Result<()> {
  let pos = level.entity(player).unwrap().pos;
  queue!(
    out,
    cursor::MoveTo(0, level.bounds().height() as u16),
    style::ResetColor,
    terminal::Clear(terminal::ClearType::CurrentLine),
    style::Print(format!("({}, {})  wasd: move  q: quit", pos.x, pos.y))
  )?;
  Ok(())
}

fn run(cfg: &Config, seed: Option<u64>) -> Result<()> {
  if cfg.width < 16 || cfg.height < 10 {
    anyhow::bail!(
      "map must be at least 16x10, got {}x{}",
      cfg.width,
      cfg.height
    );
  }
  let mut rng = match seed.or(cfg.seed) {
    Some(s) => StdRng::seed_from_u64(s),
    None => StdRng::from_entropy(),
  };

  let (mut level, rooms) = generate(cfg, &mut rng);
  if rooms.is_empty() {
    anyhow::bail!("dungeon generation produced no rooms");
  }

  let player = level.spawn(
    rooms[0].center(),
    Texel::new('@').with_fg(colors::GOLD),
  );
  for room in rooms.iter().skip(1).take(cfg.creatures as usize) {
    level.spawn(room.center(), Texel::new('K').with_fg(colors::RED));
  }

  let sync = VisionSync::new(MemoryPolicy::new(Dim(cfg.dim)));
  level.attach(sync)?;
  level.recalculate_fov(rooms[0].center(), cfg.fov_radius, cfg.metric);

  let mut out = stdout();
  for p in level.bounds().points() {
    draw_cell(&mut out, &level, p)?;
  }

  loop {
    for p in level.take_dirty() {
      draw_cell(&mut out, &level, p)?;
    }
    draw_status(&mut out, &level, player)?;
    out.flush()?;

    let key = match event::read()? {
      Event::Key(key) => key,
      Event::Resize(..) => {
        for p in level.bounds().points() {
          draw_cell(&mut out, &level, p)?;
        }
        continue;
      }
      _ => continue,
    };

    let dir = match key.code {
      KeyCode::Char('q') | KeyCode::Esc => break,
      KeyCode::Char('w') => Point::new(0, -1),
      KeyCode::Char('s') => Point::new(0, 1),
      KeyCode::Char('a') => Point::new(-1, 0),
      KeyCode::Char('d') => Point::new(1, 0),
      _ => continue,
    };

    let from = level.entity(player).unwrap().pos;
    let to = from + dir;
    let solid = level.terrain(to).map(|t| t.is_solid()).unwrap_or(true);
    let occupied = level.entities_at(to).next().is_some();
    if solid || occupied {
      continue;
    }

    level.move_entity(player, to);
    level.recalculate_fov(to, cfg.fov_radius, cfg.metric);
  }

  Ok(())
}

fn main() -> Result<()> {
  env_logger::init();
  let opt = Opt::from_args();

  let cfg = match &opt.config {
    Some(path) => {
      let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
      ron::de::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?
    }
    None => Config::default(),
  };

  terminal::enable_raw_mode()?;
  execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

  let result = run(&cfg, opt.seed);

  execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;
  terminal::disable_raw_mode()?;
  result
}
