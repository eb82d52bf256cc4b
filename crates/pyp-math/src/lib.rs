//! Numerics and sampling primitives for the seating engine.

pub mod math;

pub use math::beta::log_beta_pdf;
pub use math::gamma::gamma_log_pdf;
pub use math::sampling::*;
pub use math::slice::SliceSampler;
pub use math::stable::*;
