use tokio::sync::broadcast;

pub const CONTENT_REQUESTS: &str = "content_requests";
pub const GENERATED_ARTICLES: &str = "generated_articles";
pub const ARTICLE_IMAGES: &str = "article_images";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Row-level change notification. Subscribers are expected to refetch
/// whatever they display for `table` rather than patch state in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: &'static str,
    pub kind: ChangeKind,
    pub id: String,
}

pub(super) struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub(super) fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub(super) fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub(super) fn publish(&self, table: &'static str, kind: ChangeKind, id: impl ToString) {
        // No receivers is fine
        let _ = self.tx.send(ChangeEvent {
            table,
            kind,
            id: id.to_string(),
        });
    }
}
