//! EnrollmentCache port - cached per-user enrollment listings.
//!
//! Cache failures never fail a request; callers log them and fall back
//! to the ledger.
//!
//! Each user has a generation counter that `invalidate` bumps. A listing
//! is stored with the generation read before the ledger query and is only
//! served while that generation is current, so a listing read before an
//! enrollment was granted cannot outlive the invalidation.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::payment::Enrollment;

#[async_trait]
pub trait EnrollmentCache: Send + Sync {
    /// Cached listing, if present and written under the current generation.
    async fn get(&self, user_id: &UserId) -> Result<Option<Vec<Enrollment>>, DomainError>;

    /// Current generation. Read it before querying the ledger.
    async fn generation(&self, user_id: &UserId) -> Result<u64, DomainError>;

    /// Store a listing read under `generation`.
    async fn put(
        &self,
        user_id: &UserId,
        generation: u64,
        enrollments: &[Enrollment],
    ) -> Result<(), DomainError>;

    /// Bump the generation and drop the cached listing after the user's
    /// enrollments change.
    async fn invalidate(&self, user_id: &UserId) -> Result<(), DomainError>;
}
