// src/utils/confirmation.rs
//
// The confirmation-code state machine. Per account the stored code moves
// between two states: the sentinel ("no active code") and an issued 6-digit
// code. Signup always issues a fresh code; a failed exchange resets the
// stored code to the sentinel.

use rand::Rng;

/// Generates a fresh 6-digit numeric code. Leading zeros are significant,
/// so the code is formatted as a zero-padded string (e.g. "000017").
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// Outcome of a token-exchange attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeDecision {
    /// Code matched: issue an access token. The stored code is left in
    /// place, so repeated exchanges with a still-valid code keep working
    /// until a failed attempt revokes it. Deliberate behavior.
    Issue,
    /// Code did not match (or no code is active): reset the stored code to
    /// the sentinel and reject. The caller must sign up again.
    RevokeAndReject,
}

/// Decides a token exchange from the stored code and the submitted one.
/// The sentinel can never match, even if submitted verbatim.
pub fn exchange_decision(stored: &str, submitted: &str, sentinel: &str) -> ExchangeDecision {
    if submitted == stored && stored != sentinel {
        ExchangeDecision::Issue
    } else {
        ExchangeDecision::RevokeAndReject
    }
}
