//! One-time credential gate
//!
//! Maps a normalized subject identifier to a six-digit code and the time it
//! was issued. A credential lives for [`OTP_EXPIRY_SECS`] seconds, is
//! consumed by a successful verification, evicted by an expired attempt, and
//! survives a wrong code so the subject can retry inside the window.

use crate::error::ChainError;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Credential lifetime.
pub const OTP_EXPIRY_SECS: i64 = 60;

/// Smallest code that can be issued.
pub const OTP_MIN: u32 = 100_000;

/// Largest code that can be issued.
pub const OTP_MAX: u32 = 999_999;

/// Source of the current time, injected so expiry can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[derive(Debug, Clone)]
struct Credential {
    code: String,
    issued_at: DateTime<Utc>,
}

/// What a submitted code found in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialState {
    Absent,
    Expired,
    Mismatch,
    Match,
}

pub struct OtpStore {
    credentials: Mutex<HashMap<String, Credential>>,
    clock: Arc<dyn Clock>,
}

impl OtpStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        OtpStore {
            credentials: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn expiry() -> Duration {
        Duration::seconds(OTP_EXPIRY_SECS)
    }

    /// Issue a fresh code for `subject_id`, replacing any live one.
    ///
    /// The caller delivers the code; it is never logged here.
    pub fn issue(&self, subject_id: &str) -> String {
        let code = OsRng.gen_range(OTP_MIN..=OTP_MAX).to_string();
        let issued_at = self.clock.now();

        let replaced = self
            .credentials
            .lock()
            .insert(
                subject_id.to_string(),
                Credential {
                    code: code.clone(),
                    issued_at,
                },
            )
            .is_some();

        info!(subject_id, replaced, "otp.issued");
        code
    }

    /// Check a submitted code without consuming it on success.
    pub fn verify(&self, subject_id: &str, submitted_code: &str) -> Result<(), ChainError> {
        let mut credentials = self.credentials.lock();
        Self::check(&mut credentials, subject_id, submitted_code, self.clock.now())
    }

    /// Check a submitted code and evict it on success, atomically, so one
    /// code can never satisfy two concurrent attempts.
    ///
    /// The error decides what is left behind: after `CredentialMismatch` the
    /// credential is still stored, after `CredentialAbsentOrExpired` it is not.
    pub fn consume(&self, subject_id: &str, submitted_code: &str) -> Result<(), ChainError> {
        let mut credentials = self.credentials.lock();
        Self::check(&mut credentials, subject_id, submitted_code, self.clock.now())?;
        credentials.remove(subject_id);
        info!(subject_id, "otp.consumed");
        Ok(())
    }

    fn check(
        credentials: &mut HashMap<String, Credential>,
        subject_id: &str,
        submitted_code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ChainError> {
        let state = match credentials.get(subject_id) {
            None => CredentialState::Absent,
            Some(c) if now - c.issued_at > Self::expiry() => CredentialState::Expired,
            Some(c) if c.code != submitted_code => CredentialState::Mismatch,
            Some(_) => CredentialState::Match,
        };

        match state {
            CredentialState::Absent => Err(ChainError::CredentialAbsentOrExpired),
            CredentialState::Expired => {
                credentials.remove(subject_id);
                warn!(subject_id, "otp.expired");
                Err(ChainError::CredentialAbsentOrExpired)
            }
            CredentialState::Mismatch => {
                warn!(subject_id, "otp.mismatch");
                Err(ChainError::CredentialMismatch)
            }
            CredentialState::Match => Ok(()),
        }
    }

    /// Drop the credential for `subject_id`, returning whether one existed.
    pub fn revoke(&self, subject_id: &str) -> bool {
        self.credentials.lock().remove(subject_id).is_some()
    }

    pub fn contains(&self, subject_id: &str) -> bool {
        self.credentials.lock().contains_key(subject_id)
    }

    pub fn len(&self) -> usize {
        self.credentials.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.lock().is_empty()
    }

    /// Evict every expired credential; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut credentials = self.credentials.lock();
        let before = credentials.len();
        credentials.retain(|_, c| now - c.issued_at <= Self::expiry());
        before - credentials.len()
    }
}

impl Default for OtpStore {
    fn default() -> Self {
        Self::new()
    }
}
