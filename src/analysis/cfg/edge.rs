//! Control-flow edge kinds.

use std::fmt;

/// The kind of control flow an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Fall-through, branch, switch case, return, or entry into a handler from its placeholder
    Normal,
    /// Transfer of a thrown exception: a protected block to its handler placeholder, a
    /// placeholder to its enclosing placeholder, or an uncaught throw to the exceptional exit
    Exceptional,
}

impl EdgeKind {
    /// `true` for [`EdgeKind::Exceptional`].
    #[must_use]
    pub fn is_exceptional(self) -> bool {
        self == EdgeKind::Exceptional
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Normal => write!(f, "normal"),
            EdgeKind::Exceptional => write!(f, "exceptional"),
        }
    }
}
