use serde::{Deserialize, Deserializer};

/// Deserializer for nullable columns on partial-update bodies. Combined with
/// `#[serde(default)]`, an omitted field stays `None` (leave the column
/// alone) while an explicit `null` becomes `Some(None)` (clear it).
pub fn nullable_field<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
