//! Terminal screens rendered in place of protected content.

use super::GuardState;

/// The single call to action offered by a terminal screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    /// Navigate to the login page.
    GoToLogin,
    /// Clear the expired session, then navigate to the login page.
    LoginAgain,
    /// Re-run token verification.
    TryAgain,
    /// Navigate to the default authenticated page.
    GoBack,
}

impl PrimaryAction {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::GoToLogin => "Go to Login",
            Self::LoginAgain => "Login Again",
            Self::TryAgain => "Try Again",
            Self::GoBack => "Go Back",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub title: &'static str,
    pub message: String,
    /// `None` only for the loading screen.
    pub action: Option<PrimaryAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Render {
    /// Render the protected content.
    Children,
    Screen(Screen),
}

#[must_use]
pub fn render(state: &GuardState) -> Render {
    let screen = match state {
        GuardState::Authenticated | GuardState::GuestAllowed => return Render::Children,
        GuardState::Verifying => Screen {
            title: "Verifying",
            message: "Verifying authentication...".to_owned(),
            action: None,
        },
        GuardState::Unauthenticated => Screen {
            title: "Authentication Required",
            message: "Please log in to access this page.".to_owned(),
            action: Some(PrimaryAction::GoToLogin),
        },
        GuardState::SessionExpired => Screen {
            title: "Session Expired",
            message: "Your session has expired. Please log in again to continue.".to_owned(),
            action: Some(PrimaryAction::LoginAgain),
        },
        GuardState::VerificationError { message } => Screen {
            title: "Authentication Error",
            message: message.clone(),
            action: Some(PrimaryAction::TryAgain),
        },
        GuardState::InsufficientRole { role } => Screen {
            title: "Access Denied",
            message: if role.is_empty() {
                "You don't have permission to access this page.".to_owned()
            } else {
                format!("Your role ({role}) doesn't have permission to access this page.")
            },
            action: Some(PrimaryAction::GoBack),
        },
    };
    Render::Screen(screen)
}
