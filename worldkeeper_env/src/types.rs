//! Common identifier types shared by the Worldkeeper crates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an id from a UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Creates a deterministic id from a seed (for simulation).
            pub fn from_seed(seed: u64) -> Self {
                let mut bytes = [0u8; 16];
                bytes[0..8].copy_from_slice(&seed.to_le_bytes());
                bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
                Self(Uuid::from_bytes(bytes))
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Full hyphenated form, used in storage keys.
            pub fn key(&self) -> String {
                self.0.hyphenated().to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                // Show first 8 chars for readability
                write!(f, "{}", &self.0.to_string()[..8])
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a simulated world.
    WorldId
}

uuid_id! {
    /// Unique identifier for the simulation instance ("engine") bound to a world.
    EngineId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_ids_are_stable() {
        assert_eq!(WorldId::from_seed(7), WorldId::from_seed(7));
        assert_ne!(WorldId::from_seed(7), WorldId::from_seed(8));
    }

    #[test]
    fn test_display_is_short_but_key_is_full() {
        let id = EngineId::from_seed(1);
        assert_eq!(id.to_string().len(), 8);
        assert_eq!(id.key().len(), 36);
        assert!(id.key().starts_with(&id.to_string()));
    }
}
