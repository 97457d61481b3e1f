//! Standardized span constructors for lock enforcement observability.

pub mod spans {
    use nickwarden_proto::Event;
    use tracing::{Span, info_span};

    /// Create a span for handling one feed event.
    pub fn event(event: &Event) -> Span {
        let kind = match event {
            Event::Message { .. } => "message",
            Event::NicknameChanged { .. } => "nickname",
            Event::ThreadRenamed { .. } => "title",
            Event::Other { .. } => "other",
        };
        match event.thread_id() {
            Some(thread) => info_span!("event", kind = kind, thread = %thread),
            None => info_span!("event", kind = kind),
        }
    }
}
