use crate::domain::{
    entities::SubscriberRecord, subscribers::categories_match, types::ContentKind,
};

/// Keep subscribed rows whose categories include `kind` or the wildcard.
pub fn select_recipients(
    kind: ContentKind,
    subscribers: Vec<SubscriberRecord>,
) -> Vec<SubscriberRecord> {
    subscribers
        .into_iter()
        .filter(|subscriber| subscriber.subscribed && categories_match(&subscriber.categories, kind))
        .collect()
}
