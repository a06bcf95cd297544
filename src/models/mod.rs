//! Data models for the staff awards portal.
//!
//! JSON shapes are camelCase to match the portal frontend.

mod category;
mod department;
mod feedback;
mod nomination;
mod session;
mod staff;
mod upload;
mod vote;

pub use category::*;
pub use department::*;
pub use feedback::*;
pub use nomination::*;
pub use session::*;
pub use staff::*;
pub use upload::*;
pub use vote::*;

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: a missing field stays `None`, an explicit `null`
/// becomes `Some(None)` and a value becomes `Some(Some(value))`.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    <Option<T> as serde::Deserialize>::deserialize(deserializer).map(Some)
}
