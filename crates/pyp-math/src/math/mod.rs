//! Core math modules.

pub mod beta;
pub mod gamma;
pub mod sampling;
pub mod slice;
pub mod stable;
