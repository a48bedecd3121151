//! 2-D polygon/polyline primitives: buffering, boolean ops, validity
//! repair, and curve densification.
//!
//! Everything here is a thin, spec-specific layer over `geo`'s own
//! algorithms (`BooleanOps`, `Buffer`, `Validation`) — this module does not
//! reimplement computational geometry that `geo` already provides well.

pub mod buffer;
pub mod densify;
pub mod ops;
pub mod repair;

pub use buffer::{export_buffer, internal_buffer};
pub use densify::{densify_geometry, Densifiable};
pub use ops::{difference, intersection, union};
pub use repair::ensure_valid;
