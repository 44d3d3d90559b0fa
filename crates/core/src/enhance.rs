//! Optional free-text enhancement.
//!
//! An [`EnhancementHook`] may rewrite narrative fields (lab comments, referral reasons,
//! reports) into richer prose. It is strictly best-effort: [`Enhancer`] bounds every call
//! with a deadline, retries once when that still fits in the budget, validates what comes
//! back, and otherwise keeps the provider's draft text.

use crate::provider::{ClinicalContext, ValueKind};
use crate::registry::ContentProfile;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest enhanced text accepted, in characters.
pub const MAX_ENHANCED_CHARS: usize = 2_000;

/// Which narrative a field carries; drives the hook's prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnhanceableField {
    LabResult,
    RadiologyReport,
    CardiologyReport,
    ReferralReason,
    DischargeSummary,
    ClinicalNote,
}

impl EnhanceableField {
    /// Classifies an enhance-eligible field. Returns `None` for kinds that never carry prose.
    pub fn classify(kind: ValueKind, profile: ContentProfile) -> Option<Self> {
        match (kind, profile) {
            (ValueKind::ObservationValue, ContentProfile::Radiology) => Some(Self::RadiologyReport),
            (ValueKind::ObservationValue, ContentProfile::Cardiology) => {
                Some(Self::CardiologyReport)
            }
            (ValueKind::ObservationValue, _) => Some(Self::LabResult),
            (ValueKind::ReferralReason, _) => Some(Self::ReferralReason),
            (
                ValueKind::ClinicalNote,
                ContentProfile::DischargeSummary | ContentProfile::Discharge,
            ) => Some(Self::DischargeSummary),
            (ValueKind::ClinicalNote, _) => Some(Self::ClinicalNote),
            _ => None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::LabResult => "laboratory result",
            Self::RadiologyReport => "radiology report",
            Self::CardiologyReport => "cardiology report",
            Self::ReferralReason => "referral reason",
            Self::DischargeSummary => "discharge summary",
            Self::ClinicalNote => "clinical note",
        }
    }
}

/// Patient facts a hook may use to ground its text. Owned so it can cross threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClinicalSummary {
    pub age: u8,
    pub sex: &'static str,
    pub specialty: &'static str,
    pub investigation: &'static str,
    pub investigation_code: &'static str,
    pub condition: Option<&'static str>,
}

impl From<&ClinicalContext> for ClinicalSummary {
    fn from(context: &ClinicalContext) -> Self {
        Self {
            age: context.demographics.age,
            sex: match context.demographics.sex {
                crate::provider::Sex::Male => "Male",
                crate::provider::Sex::Female => "Female",
            },
            specialty: context.specialty.display,
            investigation: context.investigation.name,
            investigation_code: context.investigation.code,
            condition: context.condition.map(|c| c.name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnhancementRequest {
    pub field: EnhanceableField,
    pub summary: ClinicalSummary,
    /// Provider text; returned unchanged whenever enhancement fails.
    pub draft: String,
}

/// Why an enhancement attempt produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnhancementUnavailable {
    #[error("enhancement hook is not configured")]
    NotConfigured,
    #[error("enhancement timed out")]
    Timeout,
    #[error("enhancement service rejected the credentials")]
    Unauthorised,
    #[error("enhancement transport failed: {0}")]
    Transport(String),
    #[error("enhancement response was malformed: {0}")]
    Malformed(String),
}

impl EnhancementUnavailable {
    fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotConfigured | Self::Unauthorised)
    }
}

/// External text rewriter.
///
/// Implementations may block; [`Enhancer`] runs them on a worker thread and stops waiting
/// once `timeout` has elapsed.
pub trait EnhancementHook: Send + Sync {
    fn enhance(
        &self,
        request: &EnhancementRequest,
        timeout: Duration,
    ) -> Result<String, EnhancementUnavailable>;
}

/// Fail-silent wrapper around an [`EnhancementHook`].
#[derive(Clone)]
pub struct Enhancer {
    hook: Arc<dyn EnhancementHook>,
    budget: Duration,
}

impl std::fmt::Debug for Enhancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enhancer")
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl Enhancer {
    pub fn new(hook: Arc<dyn EnhancementHook>, budget: Duration) -> Self {
        Self { hook, budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Returns enhanced text, or the draft if the hook fails in any way.
    pub fn enhance_or_draft(&self, request: EnhancementRequest) -> String {
        self.enhance_or_draft_until(request, Instant::now() + self.budget)
    }

    /// Like [`Enhancer::enhance_or_draft`], but every attempt must finish by `deadline`.
    ///
    /// Several fields of one message share a single deadline this way.
    pub fn enhance_or_draft_until(&self, request: EnhancementRequest, deadline: Instant) -> String {
        match self.try_enhance_until(&request, deadline) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(
                    field = request.field.describe(),
                    error = %err,
                    "enhancement unavailable, keeping provider text"
                );
                request.draft
            }
        }
    }

    /// Runs the hook with one retry, all within the configured budget.
    ///
    /// # Errors
    ///
    /// Returns the last [`EnhancementUnavailable`] seen.
    pub fn try_enhance(
        &self,
        request: &EnhancementRequest,
    ) -> Result<String, EnhancementUnavailable> {
        self.try_enhance_until(request, Instant::now() + self.budget)
    }

    /// Runs the hook with one retry, both attempts ending by `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`EnhancementUnavailable::Timeout`] straight away once `deadline` has passed,
    /// otherwise the last [`EnhancementUnavailable`] seen.
    pub fn try_enhance_until(
        &self,
        request: &EnhancementRequest,
        deadline: Instant,
    ) -> Result<String, EnhancementUnavailable> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(EnhancementUnavailable::Timeout);
        }
        match self.attempt(request, remaining) {
            Err(err) if err.is_retryable() => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(err);
                }
                tracing::debug!(error = %err, ?remaining, "retrying enhancement");
                self.attempt(request, remaining)
            }
            other => other,
        }
    }

    fn attempt(
        &self,
        request: &EnhancementRequest,
        timeout: Duration,
    ) -> Result<String, EnhancementUnavailable> {
        let (tx, rx) = mpsc::channel();
        let hook = Arc::clone(&self.hook);
        let owned = request.clone();

        // The worker is detached; a hook that overruns is abandoned, not joined.
        thread::Builder::new()
            .name("syntgen-enhance".into())
            .spawn(move || {
                let _ = tx.send(hook.enhance(&owned, timeout));
            })
            .map_err(|e| EnhancementUnavailable::Transport(e.to_string()))?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result.and_then(validate_enhanced_text),
            Err(RecvTimeoutError::Timeout) => Err(EnhancementUnavailable::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(EnhancementUnavailable::Transport(
                "enhancement worker exited without a response".into(),
            )),
        }
    }
}

/// Accepts hook output only if every encoder can carry it.
///
/// Tabs become spaces and every line break becomes `\n`; any other control character, empty
/// text or text over [`MAX_ENHANCED_CHARS`] is rejected.
pub fn validate_enhanced_text(text: String) -> Result<String, EnhancementUnavailable> {
    let text = text
        .trim()
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\t', " ");
    if text.is_empty() {
        return Err(EnhancementUnavailable::Malformed("empty text".into()));
    }
    if text.chars().count() > MAX_ENHANCED_CHARS {
        return Err(EnhancementUnavailable::Malformed(format!(
            "text longer than {MAX_ENHANCED_CHARS} characters"
        )));
    }
    if let Some(c) = text
        .chars()
        .find(|c| c.is_control() && *c != '\n')
    {
        return Err(EnhancementUnavailable::Malformed(format!(
            "control character U+{:04X}",
            u32::from(c)
        )));
    }
    Ok(text)
}
