//! Event topic identifiers used across transports.

/// Machine-friendly discriminator for SSE consumers.
#[must_use]
pub const fn event_kind(event: &crate::payloads::SyncEvent) -> &'static str {
    event.kind()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::SyncEvent;
    use chrono::Utc;

    #[test]
    fn event_kind_matches_payload() {
        assert_eq!(
            event_kind(&SyncEvent::AuthRefreshed {
                expires_at: Utc::now()
            }),
            "auth_refreshed"
        );
        assert_eq!(
            event_kind(&SyncEvent::Failed {
                stage: "list".into(),
                message: "x".into(),
            }),
            "failed"
        );
    }
}
