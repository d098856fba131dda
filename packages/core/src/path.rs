//! Canonical dotted paths addressing locations in a state tree.
//!
//! A path is a sequence of property names joined with `.`, for example
//! `users.0.name`. A component starting with `/` is a *resource key*: it names
//! a lazily-fetched resource rather than a structural location, and it always
//! leads the path (`/users/1.name`).

use std::fmt;

/// Separator between path components.
pub const SEPARATOR: char = '.';

/// Marker that starts a resource key.
pub const RESOURCE_MARKER: char = '/';

/// The pseudo-property holding an array's length.
pub const LENGTH: &str = "length";

/// Errors related to path parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A path component cannot be addressed.
    InvalidComponent {
        component: String,
        position: usize,
        message: String,
    },
    /// The path string is invalid.
    InvalidPath { message: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::InvalidComponent {
                component,
                position,
                message,
            } => {
                write!(
                    f,
                    "invalid path component '{}' at position {}: {}",
                    component, position, message
                )
            }
            PathError::InvalidPath { message } => {
                write!(f, "invalid path: {}", message)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// Join a parent path string and a property name.
///
/// A property that is a resource key replaces the parent entirely, since
/// resources are addressed from the root.
///
/// ```rust
/// use statetree_core::path::join;
///
/// assert_eq!(join("", "user"), "user");
/// assert_eq!(join("user", "name"), "user.name");
/// assert_eq!(join("user", "/users/1"), "/users/1");
/// ```
pub fn join(parent: &str, prop: &str) -> String {
    if is_resource_key(prop) || parent.is_empty() {
        prop.to_string()
    } else {
        format!("{}{}{}", parent, SEPARATOR, prop)
    }
}

/// Whether a property name denotes a resource key.
pub fn is_resource_key(prop: &str) -> bool {
    prop.starts_with(RESOURCE_MARKER)
}

/// Interpret a component as an array index.
///
/// Only canonical integers are indices: `"0"` and `"12"` are, `"01"` and
/// `"-1"` are plain keys.
pub fn as_index(component: &str) -> Option<usize> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if component.len() > 1 && component.starts_with('0') {
        return None;
    }
    component.parse().ok()
}

/// A validated path into the state tree.
///
/// The empty path addresses the root container.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub(crate) components: Vec<String>,
}

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path string.
    ///
    /// A leading resource key extends up to the first separator.
    ///
    /// ```rust
    /// use statetree_core::Path;
    ///
    /// let path = Path::parse("users.0.name").unwrap();
    /// assert_eq!(path.len(), 3);
    ///
    /// let path = Path::parse("/users/1.name").unwrap();
    /// assert_eq!(path.resource_key(), Some("/users/1"));
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let mut components = Vec::new();
        let rest = if is_resource_key(s) {
            match s.find(SEPARATOR) {
                Some(i) => {
                    components.push(s[..i].to_string());
                    Some(&s[i + 1..])
                }
                None => {
                    components.push(s.to_string());
                    None
                }
            }
        } else {
            Some(s)
        };

        if let Some(rest) = rest {
            components.extend(rest.split(SEPARATOR).map(str::to_string));
        }

        Self::try_from_components(components)
    }

    /// The path of a single resource key.
    pub fn resource(key: &str) -> Result<Self, PathError> {
        if !is_resource_key(key) {
            return Err(PathError::InvalidPath {
                message: format!("'{}' is not a resource key", key),
            });
        }
        Self::try_from_components(vec![key.to_string()])
    }

    /// Try to create a path from components, validating each.
    pub fn try_from_components(components: Vec<String>) -> Result<Self, PathError> {
        for (i, component) in components.iter().enumerate() {
            Self::validate_component(component, i)?;
        }
        Ok(Path { components })
    }

    fn validate_component(component: &str, position: usize) -> Result<(), PathError> {
        let invalid = |message: &str| PathError::InvalidComponent {
            component: component.to_string(),
            position,
            message: message.to_string(),
        };

        if component.is_empty() {
            return Err(invalid("empty component"));
        }
        if component.contains(SEPARATOR) {
            return Err(invalid("property names cannot contain the '.' separator"));
        }
        if is_resource_key(component) && position != 0 {
            return Err(invalid("a resource key can only lead a path"));
        }
        Ok(())
    }

    /// The path of property `prop` under this path.
    ///
    /// A resource key resets the path to that key.
    pub fn child(&self, prop: &str) -> Result<Path, PathError> {
        if is_resource_key(prop) {
            return Self::resource(prop);
        }
        Self::validate_component(prop, self.components.len())?;
        let mut components = self.components.clone();
        components.push(prop.to_string());
        Ok(Path { components })
    }

    /// Check if this is the root path.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Iterate over components.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.components.iter()
    }

    /// The components as a slice.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The last component, if any.
    pub fn last(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// The first component, if any.
    pub fn first(&self) -> Option<&str> {
        self.components.first().map(String::as_str)
    }

    /// The parent path. The root has no parent.
    pub fn parent(&self) -> Option<Path> {
        if self.is_empty() {
            return None;
        }
        Some(self.slice(0, self.len() - 1))
    }

    /// Whether this path lives under a resource key.
    pub fn is_resource(&self) -> bool {
        self.resource_key().is_some()
    }

    /// The resource key leading this path, if any.
    pub fn resource_key(&self) -> Option<&str> {
        self.first().filter(|c| is_resource_key(c))
    }

    /// Check if this path has the given prefix (component-wise).
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.components.len() <= self.components.len()
            && prefix.components == self.components[..prefix.components.len()]
    }

    /// Check if this path is a proper ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.len() < other.len() && other.has_prefix(self)
    }

    /// Strip a prefix from this path.
    ///
    /// Returns `None` if the prefix doesn't match.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        if self.has_prefix(prefix) {
            Some(Path {
                components: self.components[prefix.components.len()..].to_vec(),
            })
        } else {
            None
        }
    }

    /// Get a slice of components as a new path.
    pub fn slice(&self, start: usize, end: usize) -> Path {
        Path {
            components: self.components[start..end].to_vec(),
        }
    }

    /// Replace the component at `position`, keeping everything else.
    ///
    /// Used when array elements shift and their descendants must be
    /// re-addressed.
    #[must_use]
    pub fn with_component(&self, position: usize, component: &str) -> Path {
        let mut components = self.components.clone();
        if let Some(slot) = components.get_mut(position) {
            *slot = component.to_string();
        }
        Path { components }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("."))
    }
}

impl std::ops::Index<usize> for Path {
    type Output = String;

    fn index(&self, i: usize) -> &Self::Output {
        &self.components[i]
    }
}

impl std::str::FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

/// Macro for creating paths from literals.
///
/// # Example
///
/// ```rust
/// use statetree_core::path;
///
/// let p = path!("users.0.name");
/// assert_eq!(p.len(), 3);
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s).expect("invalid path literal")
    };
}
