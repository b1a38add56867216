//! Lantern binds console glyph rendering to roguelike map logic.
//!
//! The crate's center of gravity is visibility: a [`map::Level`] owns
//! terrain, entities, and a field of view, and a seated
//! [`vision::VisionSync`] keeps every rendered appearance matched to what
//! the observer can currently see — incrementally, in response to the
//! level's own lifecycle and recomputation events. The
//! [`vision::memory`] module adds the classic map-memory treatment, where
//! explored terrain keeps a frozen, dimmed copy of its last-seen
//! appearance.
//!
//! Renderers stay outside: they drain [`map::Level::take_dirty()`] and
//! read [`gfx::texel::Texel`] values. `src/bin/demo.rs` is a small
//! crossterm dungeon crawl showing the whole binding at work.

pub mod fov;
pub mod geo;
pub mod gfx;
pub mod map;
pub mod vision;
