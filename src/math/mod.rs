//! Mathematical utilities and data structures

pub mod aabb;
pub mod plane;
pub mod frustum;

pub use aabb::Aabb;
pub use plane::Plane;
pub use frustum::Frustum;
