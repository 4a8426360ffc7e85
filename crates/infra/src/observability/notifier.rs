use tether_core::preservation::ports::NotificationObserver;
use tether_domain::NotificationSeverity;
use tracing::{error, info, warn};

/// Emits user notifications as log events under the `tether::notify` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationObserver for TracingNotifier {
    fn notify(&self, severity: NotificationSeverity, message: &str) {
        match severity {
            NotificationSeverity::Info | NotificationSeverity::Success => {
                info!(target: "tether::notify", %severity, "{message}");
            }
            NotificationSeverity::Warning => {
                warn!(target: "tether::notify", %severity, "{message}");
            }
            NotificationSeverity::Error => {
                error!(target: "tether::notify", %severity, "{message}");
            }
        }
    }
}
