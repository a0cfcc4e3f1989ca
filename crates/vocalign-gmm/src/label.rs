use std::fmt;

/// The most probable mixture component for a sample. Wraps a zero-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentLabel(usize);

impl ComponentLabel {
    /// Create a new component label from a zero-based index.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based component index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
