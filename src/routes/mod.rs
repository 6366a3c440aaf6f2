//! HTTP route modules. Each module exposes a `router()` merged into the
//! application router in `lib.rs`.

pub mod analyses;
pub mod elements;
pub mod geography;
pub mod interfaces;
pub mod matrix;
pub mod parcels;
pub mod roles;
