use tracing::{debug, warn};

use crate::error::ReconcileError;

/// Transient message for the user after a failed gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The gesture needs a signed-in user.
    LoginRequired,
    ActionFailed { message: String },
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::LoginRequired => "Please sign in to continue.",
            Notice::ActionFailed { message } => message,
        }
    }
}

/// Map a gesture error to what the user should see, if anything.
pub(crate) fn notice_for(action: &str, error: &ReconcileError) -> Option<Notice> {
    match error {
        ReconcileError::Unauthenticated => Some(Notice::LoginRequired),
        error if error.is_user_visible() => {
            warn!(action, %error, "gesture failed");
            Some(Notice::ActionFailed {
                message: format!("Couldn't {action}. Please try again."),
            })
        }
        error => {
            debug!(action, %error, "gesture dropped");
            None
        }
    }
}
