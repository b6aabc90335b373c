//! Typed node and edge handles.

use std::fmt;

macro_rules! graph_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Creates a handle from a raw index.
            #[must_use]
            #[inline]
            pub const fn new(index: usize) -> Self {
                $name(index)
            }

            /// Returns the raw index.
            #[must_use]
            #[inline]
            pub const fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(index: usize) -> Self {
                $name(index)
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

graph_id!(
    /// Index of a node in a [`crate::utils::graph::DirectedGraph`].
    NodeId,
    "n"
);

graph_id!(
    /// Index of an edge in a [`crate::utils::graph::DirectedGraph`].
    EdgeId,
    "e"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_and_formatting() {
        let node = NodeId::new(7);
        assert_eq!(node.index(), 7);
        assert_eq!(usize::from(node), 7);
        assert_eq!(NodeId::from(7), node);
        assert_eq!(format!("{node}"), "n7");
        assert_eq!(format!("{node:?}"), "NodeId(7)");

        let edge = EdgeId::new(3);
        assert_eq!(format!("{edge}"), "e3");
        assert_eq!(format!("{edge:?}"), "EdgeId(3)");
        assert!(EdgeId::new(1) < edge);
    }
}
