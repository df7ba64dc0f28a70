//! Category assignment: hero/column flags under hard cardinality limits.
//!
//! Pure state mutation with validation. Display ordering is the site
//! transformer's concern; this module only guards the invariants:
//! flag counts never exceed the configured limits, and no article is
//! ever hero and column at once.

use chrono::Utc;
use tracing::info;

use frontpage_shared::{Collection, FrontpageError, Result};

/// The two mutually exclusive display slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Hero,
    Column,
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hero => write!(f, "hero"),
            Self::Column => write!(f, "column"),
        }
    }
}

/// Flag or unflag an article as a hero.
///
/// Promoting past `max_heroes` fails with `LimitExceeded` and leaves the
/// collection untouched; the caller must demote another article first.
/// Implicit eviction would surprise an editor who set the limits
/// intentionally. Promotion clears `is_column` in the same call.
/// Clearing a known article always succeeds.
pub fn set_hero(collection: &mut Collection, identity: &str, value: bool) -> Result<()> {
    set_slot(collection, identity, Slot::Hero, value)
}

/// Flag or unflag an article as a column. Same rules as [`set_hero`],
/// against `max_columns`, clearing `is_hero` on promotion.
pub fn set_column(collection: &mut Collection, identity: &str, value: bool) -> Result<()> {
    set_slot(collection, identity, Slot::Column, value)
}

/// Shared implementation for both slots.
pub fn set_slot(
    collection: &mut Collection,
    identity: &str,
    slot: Slot,
    value: bool,
) -> Result<()> {
    let (flagged, limit) = match slot {
        Slot::Hero => (collection.hero_count(), collection.limits.max_heroes),
        Slot::Column => (collection.column_count(), collection.limits.max_columns),
    };

    let now = Utc::now();
    let Some(article) = collection.get_mut(identity) else {
        return Err(FrontpageError::validation(format!(
            "no article with identity '{identity}'"
        )));
    };

    let current = match slot {
        Slot::Hero => article.is_hero,
        Slot::Column => article.is_column,
    };

    if current == value {
        return Ok(());
    }

    if value && flagged >= limit {
        return Err(FrontpageError::limit_exceeded(format!(
            "{flagged} {slot} articles already flagged (max {limit})"
        )));
    }

    match slot {
        Slot::Hero => {
            article.is_hero = value;
            if value {
                article.is_column = false;
            }
        }
        Slot::Column => {
            article.is_column = value;
            if value {
                article.is_hero = false;
            }
        }
    }
    article.updated_at = now;
    collection.last_updated = now;

    info!(identity, %slot, value, "category flag changed");
    Ok(())
}
