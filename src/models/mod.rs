pub mod app_state;
pub mod profile;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Distinguishes an explicit `null` from an absent field: absent stays `None`
/// (via `#[serde(default)]`), `null` becomes `Some(None)`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
