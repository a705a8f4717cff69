//! Outcomes of the guard nodes

/// Prefix of the message shown when a question is declined
pub const DECLINE_PREFIX: &str = "Não posso responder a isso.";

/// Result of the input guardrail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardrailDecision {
    Approved,
    Rejected { reason: String },
}

impl GuardrailDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// User-facing decline message, if rejected
    pub fn decline_message(&self) -> Option<String> {
        match self {
            Self::Approved => None,
            Self::Rejected { reason } => Some(decline_message(reason)),
        }
    }
}

pub fn decline_message(reason: &str) -> String {
    let reason = reason.trim();
    if reason.is_empty() {
        DECLINE_PREFIX.to_string()
    } else {
        format!("{} {}", DECLINE_PREFIX, reason)
    }
}

/// Result of the hallucination validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroundingDecision {
    Grounded,
    Ungrounded { reason: String },
}

impl GroundingDecision {
    pub fn is_hallucination(&self) -> bool {
        matches!(self, Self::Ungrounded { .. })
    }
}
