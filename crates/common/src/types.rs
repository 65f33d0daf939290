use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a user (buyer or seller).
    ///
    /// Identity issuance is external; the core only carries the id around.
    UserId
}

uuid_id! {
    /// Unique identifier for a listing.
    ListingId
}

uuid_id! {
    /// Unique identifier for an offer.
    OfferId
}

uuid_id! {
    /// Unique identifier for an order.
    OrderId
}

uuid_id! {
    /// Unique identifier for a notification row.
    NotificationId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_unique_ids() {
        let id1 = ListingId::new();
        let id2 = ListingId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = UserId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn serialization_roundtrip() {
        let id = OfferId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: OfferId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = OrderId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn display_matches_uuid() {
        let uuid = Uuid::new_v4();
        let id = NotificationId::from_uuid(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }
}
