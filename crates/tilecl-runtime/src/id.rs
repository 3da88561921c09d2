#[macro_export(local_inner_macros)]
/// Create a new unique ID type.
macro_rules! unique_id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Hash, PartialEq, Eq, Debug, PartialOrd, Ord)]
        pub struct $name {
            value: u64,
        }

        impl $name {
            /// Create a new ID.
            pub fn new() -> Self {
                use core::sync::atomic::{AtomicU64, Ordering};

                static COUNTER: AtomicU64 = AtomicU64::new(0);

                let value = COUNTER.fetch_add(1, Ordering::Relaxed);
                if value == u64::MAX {
                    core::panic!("ID overflowed");
                }
                Self { value }
            }

            /// The raw value of the ID.
            pub fn value(&self) -> u64 {
                self.value
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::write!(f, "#{}", self.value)
            }
        }
    };
}

unique_id_type!(
    /// Identifies a tile placed in an on-chip tier.
    PlacementId
);

unique_id_type!(
    /// Identifies a flag set between two pipes.
    FlagId
);
