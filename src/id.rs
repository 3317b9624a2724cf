use std::fmt;

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Stable identifier of a [`Parameter`](crate::param::Parameter) in the graph arena.
    ParamId,
    "p"
);
arena_id!(
    /// Stable identifier of a [`ParameterGroup`](crate::group::ParameterGroup).
    GroupId,
    "g"
);
arena_id!(
    /// Stable identifier of a [`Node`](crate::node::Node).
    NodeId,
    "n"
);
arena_id!(
    /// Stable identifier of a [`Connection`](crate::graph::Connection).
    ///
    /// Connection ids matter for one-or-more inputs, which may hold several
    /// simultaneous incoming connections that are later disconnected by id.
    ConnectionId,
    "c"
);

/// Monotonic id allocator backing each arena.
#[derive(Debug, Default, Clone)]
pub(crate) struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub(crate) fn next(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}
