//! Subscriber invariants: email normalisation, category tags, tokens.

use uuid::Uuid;

use crate::domain::{
    error::DomainError,
    types::{ALL_CATEGORY, ContentKind},
};

/// Trim and lower-case an email so it can serve as the uniqueness key.
pub fn normalize_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim().to_ascii_lowercase();
    if email.is_empty() {
        return Err(DomainError::validation("email is required"));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(DomainError::validation("email must contain `@`"));
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(DomainError::validation("email is malformed"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("email must not contain whitespace"));
    }

    Ok(email)
}

/// Validate category tags. An empty list subscribes to everything.
pub fn parse_categories<I, S>(raw: I) -> Result<Vec<String>, DomainError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut categories: Vec<String> = Vec::new();
    for value in raw {
        let tag = value.as_ref().trim();
        if tag.is_empty() {
            continue;
        }
        let canonical = if tag == ALL_CATEGORY {
            ALL_CATEGORY
        } else {
            ContentKind::parse(tag)
                .map(ContentKind::as_str)
                .ok_or_else(|| {
                    DomainError::validation(format!("unknown newsletter category `{tag}`"))
                })?
        };
        if !categories.iter().any(|existing| existing == canonical) {
            categories.push(canonical.to_string());
        }
    }

    if categories.is_empty() {
        categories.push(ALL_CATEGORY.to_string());
    }

    Ok(categories)
}

/// Exact, case-sensitive membership of the kind tag or the wildcard.
pub fn categories_match(categories: &[String], kind: ContentKind) -> bool {
    categories
        .iter()
        .any(|tag| tag == kind.as_str() || tag == ALL_CATEGORY)
}

/// Mint an opaque unsubscribe token. Called once per subscriber.
pub fn generate_unsubscribe_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
