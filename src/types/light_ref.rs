//! Addressing a light without fetching it.

use std::fmt;

/// How a light is addressed.
///
/// An id is usable right away. A name is only an address once the full light
/// list has been fetched, which happens at the start of every operation.
///
/// ```
/// use hue_command_rs::LightRef;
///
/// assert_eq!(LightRef::from(3), LightRef::Id(3));
/// assert_eq!(LightRef::from("Bookcase"), LightRef::Name("Bookcase".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LightRef {
    Id(u32),
    Name(String),
}

impl From<u32> for LightRef {
    fn from(id: u32) -> Self {
        LightRef::Id(id)
    }
}

impl From<&str> for LightRef {
    fn from(name: &str) -> Self {
        LightRef::Name(name.to_string())
    }
}

impl From<String> for LightRef {
    fn from(name: String) -> Self {
        LightRef::Name(name)
    }
}

impl fmt::Display for LightRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightRef::Id(id) => write!(f, "#{id}"),
            LightRef::Name(name) => write!(f, "{name:?}"),
        }
    }
}
