//! Publications: static CRUD plus idempotent amendment from an external source.

use log::{info, warn};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::{
    directory::set_scholar_link,
    errors::{PortalError, ValidationError},
    scholar::{FetchedPublication, PublicationSource, scholar_profile_id},
    types::ActingUser,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publication {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub authors: String,
    pub year: String,
    pub citations: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublicationInput {
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub citations: String,
}

impl PublicationInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn authors(mut self, authors: impl Into<String>) -> Self {
        self.authors = authors.into();
        self
    }

    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.year = year.into();
        self
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::single("title", "validation.required", "title is required"));
        }
        Ok(())
    }
}

impl From<&FetchedPublication> for PublicationInput {
    fn from(fetched: &FetchedPublication) -> Self {
        Self {
            title: fetched.title.trim().to_string(),
            authors: fetched.authors.trim().to_string(),
            year: fetched.year.clone(),
            citations: if fetched.citations.is_empty() {
                "0".to_string()
            } else {
                fetched.citations.clone()
            },
        }
    }
}

/// Counts from one amendment run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AmendSummary {
    pub fetched: usize,
    pub saved: usize,
    pub skipped: usize,
}

fn insert(conn: &Connection, owner_id: i64, input: &PublicationInput) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO publications (user_id, title, authors, year, citations) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![owner_id, input.title.trim(), input.authors, input.year, input.citations],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Owner check shared by update and delete; uniform `Unauthorized` for non-admins.
fn authorize(conn: &Connection, actor: &ActingUser, id: i64) -> Result<(), PortalError> {
    let owner: Option<i64> = conn
        .query_row("SELECT user_id FROM publications WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    match owner {
        Some(owner) if actor.may_access(owner) => Ok(()),
        None if actor.is_admin() => Err(PortalError::not_found("publication", Some(id))),
        _ => Err(PortalError::Unauthorized),
    }
}

pub fn add_publication(conn: &Connection, actor: &ActingUser, input: &PublicationInput) -> Result<i64, PortalError> {
    input.validate()?;
    let id = insert(conn, actor.id, input).map_err(PortalError::save_failed)?;
    info!("user {} added publication {id}", actor.id);
    Ok(id)
}

pub fn update_publication(
    conn: &Connection,
    actor: &ActingUser,
    id: i64,
    input: &PublicationInput,
) -> Result<(), PortalError> {
    authorize(conn, actor, id)?;
    input.validate()?;
    conn.execute(
        "UPDATE publications SET title = ?1, authors = ?2, year = ?3, citations = ?4 WHERE id = ?5",
        params![input.title.trim(), input.authors, input.year, input.citations, id],
    )
    .map_err(PortalError::save_failed)?;
    Ok(())
}

pub fn delete_publication(conn: &Connection, actor: &ActingUser, id: i64) -> Result<(), PortalError> {
    authorize(conn, actor, id)?;
    conn.execute("DELETE FROM publications WHERE id = ?1", params![id])?;
    info!("user {} deleted publication {id}", actor.id);
    Ok(())
}

/// Publications of `owner_id`, newest year first. Owners and admins only.
pub fn list_publications(conn: &Connection, actor: &ActingUser, owner_id: i64) -> Result<Vec<Publication>, PortalError> {
    if !actor.may_access(owner_id) {
        return Err(PortalError::Unauthorized);
    }
    let mut stmt = conn.prepare(
        "SELECT id, user_id, title, IFNULL(authors, ''), IFNULL(year, ''), IFNULL(citations, '')
         FROM publications WHERE user_id = ?1 ORDER BY year DESC, id",
    )?;
    let publications = stmt
        .query_map(params![owner_id], |row| {
            Ok(Publication {
                id: row.get(0)?,
                user_id: row.get(1)?,
                title: row.get(2)?,
                authors: row.get(3)?,
                year: row.get(4)?,
                citations: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(publications)
}

/// Replaces every publication of `owner_id` with `entries` in one transaction.
pub fn replace_publications(
    conn: &mut Connection,
    actor: &ActingUser,
    owner_id: i64,
    entries: &[PublicationInput],
) -> Result<usize, PortalError> {
    if !actor.may_access(owner_id) {
        return Err(PortalError::Unauthorized);
    }
    for entry in entries {
        entry.validate()?;
    }
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM publications WHERE user_id = ?1", params![owner_id])?;
    for entry in entries {
        insert(&tx, owner_id, entry).map_err(PortalError::save_failed)?;
    }
    tx.commit().map_err(PortalError::save_failed)?;
    info!("user {} replaced publications of user {owner_id} ({} entries)", actor.id, entries.len());
    Ok(entries.len())
}

/// Saves fetched entries for `actor`, skipping blank titles and titles already stored.
pub fn amend_publications(
    conn: &mut Connection,
    actor: &ActingUser,
    entries: &[FetchedPublication],
) -> Result<AmendSummary, PortalError> {
    let mut summary = AmendSummary {
        fetched: entries.len(),
        ..Default::default()
    };
    let tx = conn.transaction()?;
    for entry in entries {
        let input = PublicationInput::from(entry);
        if input.title.is_empty() {
            summary.skipped += 1;
            continue;
        }
        let exists = tx
            .query_row(
                "SELECT 1 FROM publications WHERE user_id = ?1 AND title = ?2",
                params![actor.id, input.title],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if exists {
            summary.skipped += 1;
            continue;
        }
        insert(&tx, actor.id, &input).map_err(PortalError::save_failed)?;
        summary.saved += 1;
    }
    tx.commit().map_err(PortalError::save_failed)?;
    info!(
        "user {}: fetched {} publication(s), saved {}, skipped {}",
        actor.id, summary.fetched, summary.saved, summary.skipped
    );
    Ok(summary)
}

/// Stores `link` as the caller's profile, fetches its publications and amends them.
pub fn import_publications(
    conn: &mut Connection,
    actor: &ActingUser,
    source: &dyn PublicationSource,
    link: &str,
) -> Result<AmendSummary, PortalError> {
    set_scholar_link(conn, actor, link)?;
    let Some(profile_id) = scholar_profile_id(link) else {
        warn!("no profile id in link {link}");
        return Err(ValidationError::single(
            "scholar_link",
            "validation.profile_id",
            "link does not contain a user= profile id",
        )
        .into());
    };
    let fetched = source.fetch(&profile_id)?;
    amend_publications(conn, actor, &fetched)
}
