//! Outbound email boundary.
//!
//! The core only needs "deliver a string to an address reliably or report
//! failure"; real delivery is a deployment concern. The default sender logs
//! the link, which is also what local development wants.

use tracing::info;

pub trait EmailSender: Send + Sync {
    /// Deliver a password-reset link. Implementations must not persist the
    /// plaintext token embedded in the URL.
    fn send_password_reset(&self, to: &str, reset_url: &str);
}

/// Logs outbound mail instead of delivering it.
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send_password_reset(&self, to: &str, reset_url: &str) {
        info!(to, reset_url, "password reset email");
    }
}

/// Build the dashboard reset link included in outbound emails.
pub(crate) fn build_reset_url(public_url: &str, token: &str) -> String {
    let base = public_url.trim_end_matches('/');
    format!("{base}/reset-password?token={token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_reset_url_trims_trailing_slash() {
        let url = build_reset_url("https://app.upflow.dev/", "tok123");
        assert_eq!(url, "https://app.upflow.dev/reset-password?token=tok123");
    }
}
