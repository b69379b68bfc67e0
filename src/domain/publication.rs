//! Publication state and "just published" transition detection.
//!
//! Content kinds record publication either as a nullable timestamp or as a
//! boolean flag. Detection runs once per create and once per update; updates
//! compare a snapshot captured before the write against the persisted result.

use time::OffsetDateTime;

/// Publication state of a single content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationState {
    Timestamp(Option<OffsetDateTime>),
    Flag(bool),
}

impl PublicationState {
    pub fn is_published(&self) -> bool {
        match self {
            PublicationState::Timestamp(value) => value.is_some(),
            PublicationState::Flag(value) => *value,
        }
    }
}

/// Publication state captured before an update is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationSnapshot {
    Captured(PublicationState),
    /// The pre-update lookup failed or found nothing.
    Unavailable,
}

impl PublicationSnapshot {
    /// Unavailable snapshots count as unpublished, so a failed lookup errs
    /// toward sending.
    pub fn was_published(&self) -> bool {
        match self {
            PublicationSnapshot::Captured(state) => state.is_published(),
            PublicationSnapshot::Unavailable => false,
        }
    }
}

/// Publication fields present in the submitted mutation payload.
///
/// The outer `Option` distinguishes "not submitted" from "submitted as null".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmittedPublication {
    pub published_at: Option<Option<OffsetDateTime>>,
    pub published: Option<bool>,
}

impl SubmittedPublication {
    fn published_at_truthy(&self) -> bool {
        matches!(self.published_at, Some(Some(_)))
    }
}

/// A freshly created item is "just published" iff it is published now.
pub fn published_on_create(current: &PublicationState) -> bool {
    current.is_published()
}

/// Decide whether an update moved the item from unpublished to published.
pub fn published_on_update(
    previous: &PublicationSnapshot,
    current: &PublicationState,
    submitted: &SubmittedPublication,
) -> bool {
    match current {
        PublicationState::Timestamp(current) => {
            timestamp_transition(previous.was_published(), *current, submitted)
        }
        PublicationState::Flag(current) => flag_transition(previous.was_published(), *current),
    }
}

fn timestamp_transition(
    was_published: bool,
    current: Option<OffsetDateTime>,
    submitted: &SubmittedPublication,
) -> bool {
    current.is_some() && submitted.published_at_truthy() && !was_published
}

fn flag_transition(was_published: bool, current: bool) -> bool {
    !was_published && current
}
