//! Idempotency markers for mirrored transactions.
//!
//! A marker is stored in the ledger's `import_id` field of every mirrored
//! transaction. It is a pure function of the original transaction id and the
//! counterpart user, so re-running a split always finds the same mirror.

use uuid::Uuid;

use crate::UserId;

/// Prefix of every marker.
pub const MARKER_PREFIX: &str = "shr:";

const MARKER_NAMESPACE: Uuid = Uuid::from_u128(0x6c5e_2f1a_93d4_4b8e_a1f7_3c0d_58e2_b914);

/// Marker of the mirror of `original_id` in `target`'s budget.
///
/// Always 36 characters long, which fits the ledger's `import_id` limit.
///
/// ```rust
/// use engine::{UserId, derive_marker, is_split_marker};
///
/// let marker = derive_marker("tx-1", UserId(2));
/// assert_eq!(marker, derive_marker("tx-1", UserId(2)));
/// assert_ne!(marker, derive_marker("tx-1", UserId(3)));
/// assert_eq!(marker.len(), 36);
/// assert!(is_split_marker(&marker));
/// ```
#[must_use]
pub fn derive_marker(original_id: &str, target: UserId) -> String {
    let name = format!("{original_id}:{target}");
    let id = Uuid::new_v5(&MARKER_NAMESPACE, name.as_bytes());
    format!("{MARKER_PREFIX}{}", id.simple())
}

/// `true` if `import_id` was produced by [`derive_marker`].
#[must_use]
pub fn is_split_marker(import_id: &str) -> bool {
    import_id.strip_prefix(MARKER_PREFIX).is_some_and(|hex| {
        hex.len() == 32 && hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    })
}
