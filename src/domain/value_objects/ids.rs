//! # Identifiers
//!
//! UUID-backed identifier newtypes.
//!
//! Every aggregate has its own identifier type so that an `EventId` can never
//! be passed where a `ParticipantId` is expected. All identifiers serialize
//! transparently as their UUID string.
//!
//! # Examples
//!
//! ```
//! use eventos::domain::value_objects::{EventId, TenantId};
//!
//! let tenant = TenantId::new_v4();
//! let event = EventId::new_v4();
//! assert_ne!(tenant.as_uuid(), event.as_uuid());
//!
//! let parsed: EventId = event.to_string().parse().unwrap();
//! assert_eq!(parsed, event);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            schemars::JsonSchema,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wraps an existing UUID.
            #[inline]
            #[must_use]
            pub const fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generates a new random identifier.
            #[must_use]
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the underlying UUID.
            #[inline]
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a tenant (the company that owns events and money).
    TenantId
);
uuid_id!(
    /// Identifier of a platform user (operator, manager or admin).
    UserId
);
uuid_id!(
    /// Identifier of an event (the gathering, not a domain event).
    EventId
);
uuid_id!(
    /// Identifier of a registered participant.
    ParticipantId
);
uuid_id!(
    /// Identifier of a PDV product.
    ProductId
);
uuid_id!(
    /// Identifier of a PDV sale.
    SaleId
);
uuid_id!(
    /// Identifier of a payment transaction.
    TransactionId
);
uuid_id!(
    /// Identifier of a refund.
    RefundId
);
uuid_id!(
    /// Identifier of a check-in log entry.
    CheckinId
);
uuid_id!(
    /// Identifier of a notification.
    NotificationId
);
uuid_id!(
    /// Identifier of a treasury ledger entry.
    LedgerEntryId
);
uuid_id!(
    /// Identifier of a recorded domain event.
    DomainEventId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_v4_is_unique() {
        assert_ne!(SaleId::new_v4(), SaleId::new_v4());
    }

    #[test]
    fn display_and_parse() {
        let id = RefundId::new_v4();
        let parsed: RefundId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<TransactionId>().is_err());
    }

    #[test]
    fn serializes_transparently() {
        let uuid = Uuid::new_v4();
        let id = TenantId::new(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }
}
