//! Foundation types shared by every pass: the arena, source positions, and
//! name interning. This module has no dependency on any other module in the
//! crate.

mod arena;
mod interner;
mod span;

pub use arena::{Arena, Idx};
pub use interner::{Interner, Name};
pub use span::Position;
