mod support;

use support::Harness;
use tidings::application::subscriptions::{SubscribeCommand, SubscriptionError};
use tidings::domain::error::DomainError;

fn command(name: &str, email: &str, categories: &[&str]) -> SubscribeCommand {
    SubscribeCommand {
        name: name.to_string(),
        email: email.to_string(),
        categories: categories.iter().map(|tag| tag.to_string()).collect(),
    }
}

#[tokio::test]
async fn new_subscriber_defaults_to_every_category() {
    let harness = Harness::new();

    let subscriber = harness
        .subscriptions
        .subscribe(command("Grace", "  Grace@Example.COM ", &[]))
        .await
        .expect("subscribed");

    assert_eq!(subscriber.email, "grace@example.com");
    assert_eq!(subscriber.categories, ["all"]);
    assert!(subscriber.subscribed);
    assert!(!subscriber.unsubscribe_token.is_empty());
}

#[tokio::test]
async fn resubscribing_updates_the_existing_row_and_keeps_the_token() {
    let harness = Harness::new();
    let first = harness
        .subscriptions
        .subscribe(command("Grace", "grace@example.com", &["blog"]))
        .await
        .expect("subscribed");
    harness
        .subscriptions
        .unsubscribe(&first.unsubscribe_token)
        .await
        .expect("unsubscribed");

    let second = harness
        .subscriptions
        .subscribe(command("Grace H.", "GRACE@example.com", &["event", "job"]))
        .await
        .expect("resubscribed");

    assert_eq!(second.id, first.id);
    assert_eq!(second.unsubscribe_token, first.unsubscribe_token);
    assert_eq!(second.name, "Grace H.");
    assert_eq!(second.categories, ["event", "careers"]);
    assert!(second.subscribed);
    assert_eq!(harness.store.subscribers().len(), 1);
}

#[tokio::test]
async fn duplicate_categories_collapse() {
    let harness = Harness::new();
    let subscriber = harness
        .subscriptions
        .subscribe(command("Ada", "ada@example.com", &["job", "careers", " blog "]))
        .await
        .expect("subscribed");

    assert_eq!(subscriber.categories, ["careers", "blog"]);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_storage() {
    let harness = Harness::new();

    for bad in [
        command("", "ada@example.com", &[]),
        command("Ada", "not-an-email", &[]),
        command("Ada", "ada@example.com", &["podcast"]),
        command("Ada", "ada@example.com", &["Blog"]),
    ] {
        let err = harness
            .subscriptions
            .subscribe(bad)
            .await
            .expect_err("invalid subscription");
        assert!(matches!(
            err,
            SubscriptionError::Domain(DomainError::Validation { .. })
        ));
    }

    assert!(harness.store.subscribers().is_empty());
}

#[tokio::test]
async fn unsubscribe_keeps_the_row_and_is_idempotent() {
    let harness = Harness::new();
    let subscriber = harness
        .store
        .insert_subscriber("reader@example.com", &["all"], true);

    let first = harness
        .subscriptions
        .unsubscribe(&subscriber.unsubscribe_token)
        .await
        .expect("unsubscribed");
    let second = harness
        .subscriptions
        .unsubscribe(&subscriber.unsubscribe_token)
        .await
        .expect("still unsubscribed");

    assert!(!first.subscribed);
    assert!(!second.subscribed);
    let rows = harness.store.subscribers();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].subscribed);
}

#[tokio::test]
async fn unknown_or_blank_token_is_rejected() {
    let harness = Harness::new();
    harness
        .store
        .insert_subscriber("reader@example.com", &["all"], true);

    for token in ["no-such-token", "   "] {
        let err = harness
            .subscriptions
            .unsubscribe(token)
            .await
            .expect_err("unknown token");
        assert!(matches!(err, SubscriptionError::UnknownToken));
    }
    assert!(harness.store.subscribers()[0].subscribed);
}
