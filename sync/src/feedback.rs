//! User-facing feedback for optimistic mutations.
//!
//! Feedback is emitted as soon as the local change is applied, independent
//! of what the remote store later says.

use favorites_engine::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Added(Category),
    Removed(Category),
    Cleared,
}

impl Feedback {
    pub fn message(&self) -> &'static str {
        match self {
            Feedback::Added(Category::Business) => "Business added to favorites",
            Feedback::Added(Category::Coupon) => "Coupon added to favorites",
            Feedback::Removed(Category::Business) => "Business removed from favorites",
            Feedback::Removed(Category::Coupon) => "Coupon removed from favorites",
            Feedback::Cleared => "All favorites cleared",
        }
    }
}

/// Presentation hook, e.g. a toast layer.
pub trait FeedbackSink: Send + Sync {
    fn emit(&self, feedback: Feedback);
}

/// Writes feedback to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl FeedbackSink for LogFeedback {
    fn emit(&self, feedback: Feedback) {
        tracing::info!(feedback = ?feedback, "{}", feedback.message());
    }
}
