//! Models built on the engine's public surface.

pub mod adapted;
pub mod sequence;
pub mod tagger;

pub use adapted::AdaptedSequenceModel;
pub use sequence::SequenceModel;
pub use tagger::{TagPath, TagSequenceModel};
