use super::super::domain::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("invalid stage transition from {from} to {to}")]
    InvalidTransition { from: Stage, to: Stage },
    #[error("rejecting an application requires a decline_reason or decline_details")]
    MissingDeclineReason,
}

/// Decline fields supplied alongside a transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineInput<'a> {
    pub reason: Option<&'a str>,
    pub details: Option<&'a str>,
}

impl DeclineInput<'_> {
    fn is_present(&self) -> bool {
        let filled = |value: Option<&str>| value.map(|v| !v.trim().is_empty()).unwrap_or(false);
        filled(self.reason) || filled(self.details)
    }
}

/// Static forward table consulted after the withdrawn/draft/recruiter_request rules.
pub fn allowed_transitions(from: Stage) -> &'static [Stage] {
    use Stage::*;
    match from {
        Draft => &[AiReview, Screen, Rejected],
        AiReview => &[AiReviewed, Rejected],
        AiReviewed => &[Draft, Screen, Submitted, Rejected],
        RecruiterRequest => &[RecruiterReview, Screen, Rejected, Expired],
        RecruiterProposed => &[AiReview, Draft, RecruiterReview, Screen, Submitted, Rejected],
        RecruiterReview => &[Screen, Submitted, CompanyReview, Rejected],
        Screen => &[Submitted, CompanyReview, Rejected],
        Submitted => &[CompanyReview, Screen, Interview, Rejected, Expired],
        CompanyReview => &[CompanyFeedback, Screen, Interview, Offer, Rejected, Expired],
        CompanyFeedback => &[CompanyReview, Interview, Offer, Rejected, Expired],
        Interview => &[CompanyFeedback, Offer, Rejected],
        Offer => &[Hired, Rejected],
        Hired | Rejected | Withdrawn | Expired => &[],
    }
}

fn stage_permitted(from: Stage, to: Stage) -> bool {
    match to {
        Stage::Withdrawn | Stage::Draft | Stage::RecruiterRequest => !from.is_terminal(),
        _ => allowed_transitions(from).contains(&to),
    }
}

/// Validate `from -> to`, including the decline-reason requirement for rejections.
pub fn validate_transition(
    from: Stage,
    to: Stage,
    decline: DeclineInput<'_>,
) -> Result<(), TransitionError> {
    if !stage_permitted(from, to) {
        return Err(TransitionError::InvalidTransition { from, to });
    }
    if to == Stage::Rejected && !decline.is_present() {
        return Err(TransitionError::MissingDeclineReason);
    }
    Ok(())
}

/// Submission routes. `recruiter_review` is reachable from `ai_reviewed` and `screen` only
/// through submission, never through a generic stage update.
pub fn validate_submission(from: Stage, to: Stage) -> Result<(), TransitionError> {
    let routed = matches!(from, Stage::AiReviewed | Stage::Screen)
        && matches!(to, Stage::RecruiterReview | Stage::Submitted);
    if routed {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition { from, to })
    }
}
