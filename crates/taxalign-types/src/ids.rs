use std::fmt;

use serde::{Deserialize, Serialize};

/// Declare a `u32` newtype used as an arena or session identifier.
macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Create an identifier from a raw index.
            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            /// The raw arena index.
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a registered source hierarchy within one merge session.
    ///
    /// Assigned by the merge engine at registration time and invalidated by
    /// removal; never reused within a session.
    SourceId,
    "src"
);

id_type!(
    /// Arena index of a node within one [`SourceTree`].
    ///
    /// Only meaningful relative to its owning tree; pairing it with a
    /// [`SourceId`] makes it unambiguous within a session.
    ///
    /// [`SourceTree`]: https://docs.rs/taxalign-model
    SourceNodeId,
    "sn"
);

id_type!(
    /// Arena index of a node in the unified tree.
    UnifiedId,
    "un"
);

id_type!(
    /// Identifier of a registered view within one comparison session.
    ViewId,
    "view"
);
