use tracing::info;

use crate::domain::events::CatalogEvent;
use crate::domain::ports::EventPublisher;

/// Publishes domain events to the log.
#[derive(Clone, Debug, Default)]
pub struct LoggingEventPublisher;

impl EventPublisher<CatalogEvent> for LoggingEventPublisher {
    fn publish(&self, event: &CatalogEvent) {
        info!(
            kind = ?event.kind,
            collection = event.collection,
            id = %event.id,
            at = %event.at.to_rfc3339(),
            "domain event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::CatalogEventKind;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn logs_event_fields() {
        LoggingEventPublisher.publish(&CatalogEvent::now(
            CatalogEventKind::Restored,
            "tags",
            "t-1",
        ));
        assert!(logs_contain("domain event"));
        assert!(logs_contain("Restored"));
        assert!(logs_contain("t-1"));
    }
}
