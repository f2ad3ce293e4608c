// crates/pactum-core/src/runtime/signing.rs
// ============================================================================
// Module: Pactum Signing Calls
// Description: Deadline-bounded signing authority calls.
// Purpose: Keep external signing calls outside transactions and bounded in time.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! The authority call runs on a worker thread and the caller waits at most the
//! configured deadline. A late answer is discarded; the attempt is recorded
//! as rejected with [`AuthorityError::Timeout`]. No store lock is held while
//! waiting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::core::signature::SignatureAssertion;
use crate::interfaces::AuthorityError;
use crate::interfaces::AuthorityRequest;
use crate::interfaces::SigningAuthority;

// ============================================================================
// SECTION: Deadline Calls
// ============================================================================

/// Default deadline for one authority call.
pub const DEFAULT_SIGNING_DEADLINE: Duration = Duration::from_secs(30);

/// Calls `authority` on a worker thread and waits up to `deadline`.
///
/// # Errors
///
/// Returns the authority's own error, [`AuthorityError::Timeout`] when the
/// deadline passes, or [`AuthorityError::Unavailable`] when the worker cannot
/// be started or dies without answering.
pub fn sign_with_deadline<A>(
    authority: &Arc<A>,
    request: AuthorityRequest,
    deadline: Duration,
) -> Result<SignatureAssertion, AuthorityError>
where
    A: SigningAuthority + ?Sized + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);
    let worker_authority = Arc::clone(authority);
    thread::Builder::new()
        .name("pactum-signing".to_string())
        .spawn(move || {
            let outcome = worker_authority.sign(&request);
            // The receiver is gone after a timeout.
            let _ = sender.send(outcome);
        })
        .map_err(|err| AuthorityError::Unavailable(format!("signing worker: {err}")))?;
    match receiver.recv_timeout(deadline) {
        Ok(outcome) => outcome,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(AuthorityError::Timeout(u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX)))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(AuthorityError::Unavailable("signing worker exited without a result".to_string()))
        }
    }
}

// ============================================================================
// SECTION: Unconfigured Authority
// ============================================================================

/// Authority used when no provider is configured; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredAuthority;

impl SigningAuthority for UnconfiguredAuthority {
    fn sign(&self, _request: &AuthorityRequest) -> Result<SignatureAssertion, AuthorityError> {
        Err(AuthorityError::Unavailable("no signing authority configured".to_string()))
    }
}
