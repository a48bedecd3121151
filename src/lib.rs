//! `cornmaze-engine`: the geometry and constraint engine for seasonal
//! corn-maze layout design.
//!
//! This crate owns three tightly coupled data products — a standing-corn
//! row model, a carved-area polygon, and a cut-path centerline list — and
//! the spatial operations that keep them consistent as a designer draws,
//! carves, and undoes shapes against a real field boundary. It is a pure
//! geometry/constraint core: HTTP transport, the drawing UI, GIS file
//! parsing, and satellite tile fetching are external collaborators (see
//! [`session`] for the request/response surface those collaborators call
//! through, and [`project_store`] for the persisted-project boundary).
//!
//! There is no binary target. Callers create a [`session::Session`],
//! drive it through its methods, and read back geometry snapshots,
//! violations, and analyses — everything here is synchronous, and every
//! mutating operation is atomic (it either commits a new consistent state
//! or leaves the session untouched).

pub mod carve;
pub mod constraints;
pub mod coverage;
pub mod error;
pub mod field;
pub mod flow;
pub mod font;
pub mod geometry;
pub mod live_validator;
pub mod metrics;
pub mod pathfind;
pub mod project_store;
pub mod projection;
pub mod rasterize;
pub mod rows;
pub mod session;

pub use error::{Error, Result, Warning};
pub use field::Field;
pub use session::Session;
