//! Texels, terminal elements.
//!
//! A *texel* is a single glyph cell: a printable character plus foreground
//! and background colors, and a couple of flag bits. Unlike a raw terminal
//! cell it knows whether it is currently meant to be shown at all
//! ([`Texel::is_visible()`]), and whether it is a remembered appearance
//! rather than a live one ([`Texel::is_memory()`]).

pub use palette::named as colors;

/// An RGB value used by a [`Texel`].
pub type Rgb = palette::Srgb<u8>;

bitflags::bitflags! {
  struct Meta: u8 {
    /// The cell should be drawn. Cleared for unexplored terrain and for
    /// entities outside the field of view.
    const VISIBLE = 1 << 0;
    /// The cell is a memory: a frozen last-seen appearance that has already
    /// had its memory style applied. Cleared whenever the cell is in view.
    const MEMORY = 1 << 1;
  }
}

/// A glyph cell.
///
/// Texels are plain values; mutating one never notifies anybody. Code that
/// changes a texel reports "did this change anything" to its caller, which
/// decides whether a redraw is needed.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Texel {
  glyph: char,
  fg: Rgb,
  bg: Rgb,
  meta: Meta,
}

impl Texel {
  /// Creates a new visible texel with the given glyph, white on black.
  #[inline]
  pub fn new(glyph: char) -> Self {
    Self {
      glyph,
      fg: colors::WHITE,
      bg: colors::BLACK,
      meta: Meta::VISIBLE,
    }
  }

  /// Returns this texel's glyph.
  #[inline]
  pub fn glyph(self) -> char {
    self.glyph
  }

  /// Returns a copy of this texel with the given glyph.
  #[inline]
  pub fn with_glyph(mut self, glyph: char) -> Self {
    self.glyph = glyph;
    self
  }

  /// Returns this texel's foreground color.
  #[inline]
  pub fn fg(self) -> Rgb {
    self.fg
  }

  /// Returns a copy of this texel with the given foreground color.
  #[inline]
  pub fn with_fg(mut self, color: Rgb) -> Self {
    self.fg = color;
    self
  }

  /// Returns this texel's background color.
  #[inline]
  pub fn bg(self) -> Rgb {
    self.bg
  }

  /// Returns a copy of this texel with the given background color.
  #[inline]
  pub fn with_bg(mut self, color: Rgb) -> Self {
    self.bg = color;
    self
  }

  /// Returns whether this texel should be drawn.
  #[inline]
  pub fn is_visible(self) -> bool {
    self.meta.contains(Meta::VISIBLE)
  }

  /// Returns a copy of this texel with the visibility bit set or cleared.
  #[inline]
  pub fn with_visible(mut self, visible: bool) -> Self {
    self.meta.set(Meta::VISIBLE, visible);
    self
  }

  /// Returns whether this texel is a frozen memory.
  #[inline]
  pub fn is_memory(self) -> bool {
    self.meta.contains(Meta::MEMORY)
  }

  /// Returns a copy of this texel with the memory bit set or cleared.
  #[inline]
  pub fn with_memory(mut self, memory: bool) -> Self {
    self.meta.set(Meta::MEMORY, memory);
    self
  }

  /// Returns a copy of this texel with both colors scaled by `factor`.
  ///
  /// `factor` is expected in `0.0..=1.0`; components are clamped.
  pub fn dimmed(mut self, factor: f32) -> Self {
    self.fg = scale(self.fg, factor);
    self.bg = scale(self.bg, factor);
    self
  }
}

fn scale(color: Rgb, factor: f32) -> Rgb {
  let c: palette::Srgb<f32> = color.into_format();
  palette::Srgb::new(
    (c.red * factor).min(1.0).max(0.0),
    (c.green * factor).min(1.0).max(0.0),
    (c.blue * factor).min(1.0).max(0.0),
  )
  .into_format()
}
