//! Session lifecycle notifications
//!
//! The client does not navigate anywhere itself. When the session ends it
//! broadcasts `LoginRequired` and the embedding application decides what a
//! "redirect to login" means (the CLI prints a notice).

/// Capacity of the session event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login succeeded and tokens were stored
    LoggedIn,
    /// A 401 was recovered with a new access token
    TokensRefreshed,
    /// Refresh was impossible or failed; credentials were cleared
    LoginRequired { reason: String },
    /// Logout or account deletion cleared the session
    LoggedOut,
}
