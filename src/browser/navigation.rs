use crate::core::NavigationOutcome;
use crate::errors::{Result, SnapshotError};

/// Statuses servers use to turn away automated clients.
const BLOCKING_STATUSES: &[u16] = &[403, 429];

/// Phrases only bot-challenge interstitials use.
const BOT_SIGNATURES: &[&str] = &[
    "just a moment...",
    "attention required! | cloudflare",
    "checking your browser before accessing",
    "verify you are human",
    "are you a robot",
    "unusual traffic from your computer",
    "pardon our interruption",
    "please enable js and disable any ad blocker",
];

/// Words ordinary articles also use. They count in the title, or in the body
/// of a page too short to be real content.
const WEAK_SIGNATURES: &[&str] = &["captcha", "access denied", "request blocked"];

/// Body length, in characters, below which a page may be an interstitial.
const INTERSTITIAL_MAX_CHARS: usize = 300;

/// Fail with `NavigationBlocked` when the loaded page is a rejection rather
/// than the requested content.
pub fn ensure_not_blocked(outcome: &NavigationOutcome) -> Result<()> {
    match blocked_reason(outcome) {
        Some(reason) => Err(SnapshotError::NavigationBlocked(reason)),
        None => Ok(()),
    }
}

pub fn blocked_reason(outcome: &NavigationOutcome) -> Option<String> {
    if let Some(status) = outcome.status {
        if BLOCKING_STATUSES.contains(&status) {
            return Some(format!("{} answered with HTTP {status}", outcome.url));
        }
    }

    let title = outcome.title.to_lowercase();
    let excerpt = outcome.text_excerpt.to_lowercase();
    let short_body = excerpt.chars().count() < INTERSTITIAL_MAX_CHARS;

    let strong = BOT_SIGNATURES
        .iter()
        .find(|sig| title.contains(*sig) || excerpt.contains(*sig));
    let weak = || {
        WEAK_SIGNATURES
            .iter()
            .find(|sig| title.contains(*sig) || (short_body && excerpt.contains(*sig)))
    };
    strong
        .or_else(weak)
        .map(|sig| format!("{} served a bot check ({sig:?})", outcome.url))
}
