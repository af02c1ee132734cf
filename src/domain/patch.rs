//! Tri-state field wrapper for partial updates.

use serde::{Deserialize, Deserializer};

/// The state of one field in a partial update.
///
/// Used with `#[serde(default)]`: a missing key deserializes to `Unset`,
/// an explicit `null` to `Clear`, and any value to `Set`.
///
/// # Example
///
/// ```
/// use phonebook_mcp_server::domain::Patch;
///
/// let company: Patch<String> = Patch::Set("Acme".to_string());
/// assert!(company.is_present());
/// assert!(!Patch::<String>::Unset.is_present());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Leave the stored value untouched.
    Unset,

    /// Remove the stored value.
    Clear,

    /// Replace the stored value.
    Set(T),
}

impl<T> Patch<T> {
    /// Whether the field takes part in the update at all.
    pub fn is_present(&self) -> bool {
        !matches!(self, Patch::Unset)
    }

    /// Apply a function to the `Set` payload.
    pub fn map<U, F>(self, f: F) -> Patch<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Patch::Unset => Patch::Unset,
            Patch::Clear => Patch::Clear,
            Patch::Set(value) => Patch::Set(f(value)),
        }
    }

    /// The `Set` payload, if any. `Unset` and `Clear` both yield `None`.
    pub fn into_set(self) -> Option<T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Unset | Patch::Clear => None,
        }
    }

    /// Borrowing view of the patch.
    pub fn as_ref(&self) -> Patch<&T> {
        match self {
            Patch::Unset => Patch::Unset,
            Patch::Clear => Patch::Clear,
            Patch::Set(value) => Patch::Set(value),
        }
    }
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Unset
    }
}

impl<T> From<Option<T>> for Patch<T> {
    /// `None` means "leave untouched".
    fn from(value: Option<T>) -> Self {
        value.map_or(Patch::Unset, Patch::Set)
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Patch::Clear, Patch::Set))
    }
}
