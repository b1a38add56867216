//! Appearance primitives shared by terrain and entities.
//!
//! Rendering itself lives outside this crate; consumers read [`Texel`]
//! values and draw them however they like. The only obligations here are
//! cheap equality (so callers can tell whether an update changed anything)
//! and the color math the memory styles need.
//!
//! [`Texel`]: texel::Texel

pub mod texel;
