mod support;

use support::{Harness, MemoryStore, content_record};
use tidings::application::content::{ContentError, ContentPatch, CreateContentCommand};
use tidings::application::newsletter::NewsletterTask;
use tidings::domain::error::DomainError;
use tidings::domain::types::ContentKind;
use time::macros::datetime;
use uuid::Uuid;

fn broadcast(kind: ContentKind, item_id: Uuid) -> NewsletterTask {
    NewsletterTask::Broadcast { kind, item_id }
}

#[tokio::test]
async fn creating_published_item_schedules_one_newsletter() {
    let mut harness = Harness::new();

    let item = harness
        .content
        .create(
            ContentKind::Blog,
            CreateContentCommand {
                title: "Launch notes".into(),
                published_at: Some(datetime!(2024-05-01 09:00 UTC)),
                ..Default::default()
            },
        )
        .await
        .expect("create succeeds");

    assert_eq!(
        harness.drain_tasks(),
        vec![broadcast(ContentKind::Blog, item.id)]
    );
}

#[tokio::test]
async fn creating_draft_schedules_nothing() {
    let mut harness = Harness::new();

    harness
        .content
        .create(
            ContentKind::Webinar,
            CreateContentCommand {
                title: "Draft webinar".into(),
                ..Default::default()
            },
        )
        .await
        .expect("create succeeds");
    harness
        .content
        .create(
            ContentKind::Careers,
            CreateContentCommand {
                title: "Draft posting".into(),
                published: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("create succeeds");

    assert!(harness.drain_tasks().is_empty());
}

#[tokio::test]
async fn publishing_a_draft_sends_once_and_later_edits_do_not_resend() {
    let mut harness = Harness::new();
    let draft = harness
        .content
        .create(
            ContentKind::Event,
            CreateContentCommand {
                title: "Meetup".into(),
                ..Default::default()
            },
        )
        .await
        .expect("create succeeds");

    let publish = ContentPatch {
        published_at: Some(Some(datetime!(2024-06-01 18:00 UTC))),
        ..Default::default()
    };
    harness
        .content
        .update(ContentKind::Event, draft.id, publish.clone())
        .await
        .expect("publish succeeds");
    assert_eq!(
        harness.drain_tasks(),
        vec![broadcast(ContentKind::Event, draft.id)]
    );

    // Re-submitting the timestamp on an already published item.
    harness
        .content
        .update(ContentKind::Event, draft.id, publish)
        .await
        .expect("update succeeds");
    // Editing unrelated fields.
    harness
        .content
        .update(
            ContentKind::Event,
            draft.id,
            ContentPatch {
                title: Some("Meetup (moved)".into()),
                ..Default::default()
            },
        )
        .await
        .expect("update succeeds");

    assert!(harness.drain_tasks().is_empty());
}

#[tokio::test]
async fn editing_a_draft_without_published_at_does_not_send() {
    let mut harness = Harness::new();
    let item = content_record(ContentKind::Blog, "Quiet edit");
    harness.store.insert_content(item.clone());

    harness
        .content
        .update(
            ContentKind::Blog,
            item.id,
            ContentPatch {
                excerpt: Some(Some("Short".into())),
                ..Default::default()
            },
        )
        .await
        .expect("update succeeds");

    assert!(harness.drain_tasks().is_empty());
}

#[tokio::test]
async fn clearing_published_at_never_sends() {
    let mut harness = Harness::new();
    let mut item = content_record(ContentKind::Blog, "Retracted");
    item.published_at = Some(datetime!(2024-01-01 0:00 UTC));
    harness.store.insert_content(item.clone());

    let updated = harness
        .content
        .update(
            ContentKind::Blog,
            item.id,
            ContentPatch {
                published_at: Some(None),
                ..Default::default()
            },
        )
        .await
        .expect("update succeeds");

    assert_eq!(updated.published_at, None);
    assert!(harness.drain_tasks().is_empty());
}

#[tokio::test]
async fn flag_kind_sends_only_on_false_to_true() {
    let mut harness = Harness::new();
    let item = content_record(ContentKind::Resource, "Whitepaper");
    harness.store.insert_content(item.clone());

    let publish = ContentPatch {
        published: Some(true),
        ..Default::default()
    };
    harness
        .content
        .update(ContentKind::Resource, item.id, publish.clone())
        .await
        .expect("publish succeeds");
    harness
        .content
        .update(ContentKind::Resource, item.id, publish)
        .await
        .expect("republish succeeds");
    harness
        .content
        .update(
            ContentKind::Resource,
            item.id,
            ContentPatch {
                published: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("unpublish succeeds");

    assert_eq!(
        harness.drain_tasks(),
        vec![broadcast(ContentKind::Resource, item.id)]
    );
}

#[tokio::test]
async fn failed_previous_state_lookup_counts_as_unpublished() {
    let mut harness = Harness::new();
    let mut item = content_record(ContentKind::Careers, "Engineer");
    item.published = true;
    harness.store.insert_content(item.clone());
    MemoryStore::fail(&harness.store.fail_content_lookup);

    harness
        .content
        .update(
            ContentKind::Careers,
            item.id,
            ContentPatch {
                published: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("update still commits");

    assert_eq!(
        harness.drain_tasks(),
        vec![broadcast(ContentKind::Careers, item.id)]
    );
}

#[tokio::test]
async fn publication_field_of_the_wrong_shape_is_rejected() {
    let harness = Harness::new();

    let err = harness
        .content
        .create(
            ContentKind::Blog,
            CreateContentCommand {
                title: "Flagged blog".into(),
                published: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect_err("blog uses published_at");
    assert!(matches!(
        err,
        ContentError::Domain(DomainError::Validation { .. })
    ));

    let err = harness
        .content
        .create(
            ContentKind::Resource,
            CreateContentCommand {
                title: "Timestamped resource".into(),
                published_at: Some(datetime!(2024-01-01 0:00 UTC)),
                ..Default::default()
            },
        )
        .await
        .expect_err("resource uses published");
    assert!(matches!(
        err,
        ContentError::Domain(DomainError::Validation { .. })
    ));
}

#[tokio::test]
async fn file_references_are_checked() {
    let harness = Harness::new();

    let err = harness
        .content
        .create(
            ContentKind::Blog,
            CreateContentCommand {
                title: "Blog with attachment".into(),
                file_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
        )
        .await
        .expect_err("only resources carry files");
    assert!(matches!(err, ContentError::Domain(_)));

    let err = harness
        .content
        .create(
            ContentKind::Resource,
            CreateContentCommand {
                title: "Dangling file".into(),
                file_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
        )
        .await
        .expect_err("file must exist");
    assert!(matches!(err, ContentError::Domain(_)));
}

#[tokio::test]
async fn blank_title_is_rejected() {
    let harness = Harness::new();
    let err = harness
        .content
        .create(
            ContentKind::Event,
            CreateContentCommand {
                title: "   ".into(),
                ..Default::default()
            },
        )
        .await
        .expect_err("title required");
    assert!(matches!(err, ContentError::Domain(_)));
}

#[tokio::test]
async fn updating_unknown_or_mismatched_item_is_not_found() {
    let mut harness = Harness::new();
    let item = content_record(ContentKind::Webinar, "Webinar");
    harness.store.insert_content(item.clone());

    let missing = harness
        .content
        .update(ContentKind::Webinar, Uuid::new_v4(), ContentPatch::default())
        .await
        .expect_err("unknown id");
    assert!(matches!(missing, ContentError::NotFound { .. }));

    let mismatched = harness
        .content
        .update(
            ContentKind::Event,
            item.id,
            ContentPatch {
                published_at: Some(Some(datetime!(2024-01-01 0:00 UTC))),
                ..Default::default()
            },
        )
        .await
        .expect_err("wrong kind");
    assert!(matches!(mismatched, ContentError::NotFound { .. }));
    assert!(harness.drain_tasks().is_empty());
}
