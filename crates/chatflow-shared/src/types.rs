use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A verified user principal.
///
/// Issued into a credential token by the auth endpoints and treated as an
/// opaque, trusted claim by the relay once the token's signature and expiry
/// check out. Immutable after issuance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}
