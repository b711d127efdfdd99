//! crates/checkin_core/src/token.rs
//!
//! Wire format and freshness rules for rotating check-in tokens.
//!
//! A token looks like `CHECKIN-{event_id}-{secret}-{issued_at_millis}`. The
//! host display re-issues it at least once per freshness window; the attendee's
//! scanner hands the decoded string to [`parse`]. Tokens are bearer values that
//! only exist in transit, so nothing here touches storage.
//!
//! The parser splits naively on `-`. An event id or secret containing `-` would
//! shift the fields, which is why [`CheckInToken::issue`] refuses such values
//! instead of the parser trying to guess.

use uuid::Uuid;

pub const TOKEN_PREFIX: &str = "CHECKIN-";
pub const DELIMITER: char = '-';
/// How long after issuance a token is accepted, inclusive.
pub const FRESHNESS_WINDOW_MS: i64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed check-in token: {0}")]
    Malformed(&'static str),
    #[error("Check-in token expired (age {age_millis} ms)")]
    Expired { age_millis: i64 },
    #[error("Token field `{0}` must not contain '-'")]
    DelimiterInField(&'static str),
    #[error("Token field `{0}` must not be empty")]
    EmptyField(&'static str),
}

/// A decoded, fresh check-in token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInToken {
    pub event_id: String,
    pub secret: String,
    pub issued_at_millis: i64,
}

impl CheckInToken {
    /// Builds a token for the host display.
    pub fn issue(
        event_id: impl Into<String>,
        secret: impl Into<String>,
        issued_at_millis: i64,
    ) -> Result<Self, TokenError> {
        let event_id = event_id.into();
        let secret = secret.into();
        check_field("event_id", &event_id)?;
        check_field("secret", &secret)?;
        Ok(Self {
            event_id,
            secret,
            issued_at_millis,
        })
    }

    pub fn encode(&self) -> String {
        format!(
            "{TOKEN_PREFIX}{}{DELIMITER}{}{DELIMITER}{}",
            self.event_id, self.secret, self.issued_at_millis
        )
    }

    /// Last instant (epoch millis) at which this token is still accepted.
    pub fn expires_at_millis(&self) -> i64 {
        self.issued_at_millis.saturating_add(FRESHNESS_WINDOW_MS)
    }
}

fn check_field(name: &'static str, value: &str) -> Result<(), TokenError> {
    if value.is_empty() {
        return Err(TokenError::EmptyField(name));
    }
    if value.contains(DELIMITER) {
        return Err(TokenError::DelimiterInField(name));
    }
    Ok(())
}

/// A random secret that is safe to embed in a token.
pub fn generate_secret() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Decodes `raw` and checks that it was issued within the freshness window
/// ending at `now_millis`.
pub fn parse(raw: &str, now_millis: i64) -> Result<CheckInToken, TokenError> {
    if !raw.starts_with(TOKEN_PREFIX) {
        return Err(TokenError::Malformed("missing CHECKIN- prefix"));
    }

    let parts: Vec<&str> = raw.split(DELIMITER).collect();
    if parts.len() < 4 {
        return Err(TokenError::Malformed("expected four '-'-separated fields"));
    }

    let issued_at_millis: i64 = parts[3]
        .parse()
        .map_err(|_| TokenError::Malformed("timestamp is not an integer"))?;

    // Overflow only happens for absurd timestamps; treat them as stale.
    let age_millis = now_millis
        .checked_sub(issued_at_millis)
        .ok_or(TokenError::Expired { age_millis: i64::MIN })?;
    if !(0..=FRESHNESS_WINDOW_MS).contains(&age_millis) {
        return Err(TokenError::Expired { age_millis });
    }

    Ok(CheckInToken {
        event_id: parts[1].to_string(),
        secret: parts[2].to_string(),
        issued_at_millis,
    })
}
