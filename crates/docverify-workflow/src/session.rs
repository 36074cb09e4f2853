//! Session state store.
//!
//! Key/value state scoped to one browsing session. The store is an explicit value
//! owned by the [`crate::StageSequencer`]; nothing else reaches it ambiently. It is
//! wiped once per workflow entry so two case links never share state.

use std::collections::HashMap;
use std::fmt;

/// Keys held in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// Identifier correlating all calls for one case.
    LinkRequestId,
    /// Proof of completed OTP verification.
    VerificationToken,
    /// Request id the token was issued for.
    TokenRequestId,
    /// Display-only mobile number.
    MaskedMobile,
    /// `"true"` once the consent POST succeeded.
    ConsentSubmitted,
}

impl SessionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::LinkRequestId => "requestId",
            SessionKey::VerificationToken => "jwtToken",
            SessionKey::TokenRequestId => "tokenRequestId",
            SessionKey::MaskedMobile => "mno",
            SessionKey::ConsentSubmitted => "consentSubmitted",
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub link_request_id: Option<String>,
    pub verification_token: Option<String>,
    pub masked_mobile: Option<String>,
    pub consent_submitted: bool,
}

/// How far the session has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStanding {
    /// No `linkRequestId`.
    NoCase,
    /// Case known, no token.
    Unverified,
    /// Token issued for the current case.
    Verified,
    /// Token present but not issued for the current case (or no case at all).
    Inconsistent,
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    entries: HashMap<SessionKey, String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: SessionKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    pub fn set(&mut self, key: SessionKey, value: impl Into<String>) {
        self.entries.insert(key, value.into());
    }

    pub fn remove(&mut self, key: SessionKey) -> Option<String> {
        self.entries.remove(&key)
    }

    /// Drop every key.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!(keys = self.entries.len(), "Clearing session state");
        }
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn link_request_id(&self) -> Option<&str> {
        self.get(SessionKey::LinkRequestId)
    }

    pub fn verification_token(&self) -> Option<&str> {
        self.get(SessionKey::VerificationToken)
    }

    pub fn masked_mobile(&self) -> Option<&str> {
        self.get(SessionKey::MaskedMobile)
    }

    pub fn consent_submitted(&self) -> bool {
        self.get(SessionKey::ConsentSubmitted) == Some("true")
    }

    /// Record a token together with the case it was issued for.
    pub fn set_verification_token(&mut self, request_id: &str, token: impl Into<String>) {
        self.set(SessionKey::VerificationToken, token);
        self.set(SessionKey::TokenRequestId, request_id);
    }

    pub fn standing(&self) -> SessionStanding {
        match (self.link_request_id(), self.verification_token()) {
            (None, None) => SessionStanding::NoCase,
            (None, Some(_)) => SessionStanding::Inconsistent,
            (Some(_), None) => SessionStanding::Unverified,
            (Some(link), Some(_)) => {
                if self.get(SessionKey::TokenRequestId) == Some(link) {
                    SessionStanding::Verified
                } else {
                    SessionStanding::Inconsistent
                }
            }
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            link_request_id: self.link_request_id().map(str::to_string),
            verification_token: self.verification_token().map(str::to_string),
            masked_mobile: self.masked_mobile().map(str::to_string),
            consent_submitted: self.consent_submitted(),
        }
    }
}
