//! Login-code delivery seam
//!
//! Actual delivery (email/SMS) is an external collaborator; the service only
//! hands the code across this trait. The default implementation logs the
//! code, which is enough for local runs and tests.

/// Delivers a freshly minted login code to a vendor.
pub trait CodeNotifier: Send + Sync {
    fn deliver(&self, vendor_id: &str, code: &str);
}

/// Notifier that writes the code to the log instead of sending it anywhere.
pub struct LogNotifier;

impl CodeNotifier for LogNotifier {
    fn deliver(&self, vendor_id: &str, code: &str) {
        tracing::info!(vendor = %vendor_id, code = %code, "login code issued");
    }
}
