//! Like reconciliation - the state transition behind the like/unlike toggle.
//!
//! This is the semantic model of the toggle: given the current liker set and
//! counter, a viewer identity, and the desired liked state, compute the next
//! state. The operation is idempotent - re-applying the same request is a
//! no-op - and the counter decrement is floored at zero so the counter can
//! never go negative even if the stored state was tampered with externally.
//!
//! The store layer applies the same transition as a single conditional
//! UPDATE so concurrent toggles on one artifact cannot lose updates; this
//! function is the executable reference those queries are checked against.

/// Result of applying a like toggle to an artifact's like state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    /// The like counter after reconciliation.
    pub likes: i32,
    /// Whether the viewer is in the liker set after reconciliation.
    pub is_liked: bool,
    /// Whether the state actually changed (false for idempotent no-ops).
    pub changed: bool,
}

/// Reconcile an artifact's like state with a viewer's desired liked state.
///
/// Mutates `liked_by` in place and returns the new counter value; the caller
/// owns persisting the result. Membership is toggled, never double-added or
/// double-removed:
/// - desired=true and viewer absent: add viewer, increment counter
/// - desired=false and viewer present: remove viewer, decrement counter
///   (floored at zero)
/// - otherwise: no-op
pub fn reconcile_like(
    liked_by: &mut Vec<String>,
    likes: i32,
    viewer: &str,
    desired: bool,
) -> LikeOutcome {
    let present = liked_by.iter().any(|v| v == viewer);

    match (desired, present) {
        (true, false) => {
            liked_by.push(viewer.to_string());
            LikeOutcome {
                likes: likes.saturating_add(1),
                is_liked: true,
                changed: true,
            }
        }
        (false, true) => {
            liked_by.retain(|v| v != viewer);
            LikeOutcome {
                likes: (likes - 1).max(0),
                is_liked: false,
                changed: true,
            }
        }
        _ => LikeOutcome {
            likes,
            is_liked: present,
            changed: false,
        },
    }
}
