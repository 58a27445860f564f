use crate::dedup::Signature;
use crate::error::StoreError;
use crate::models::{Listing, Platform};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Persistence collaborator for discovered listings.
///
/// `insert` must enforce uniqueness of the signature itself so two overlapping
/// search passes cannot both store the same listing.
pub trait ListingStore: Send + Sync {
    fn find_by_signature(&self, signature: &Signature) -> Result<Option<Listing>, StoreError>;

    /// Fails with `StoreError::DuplicateKey` when the signature is already stored
    fn insert(&self, listing: &Listing) -> Result<(), StoreError>;

    /// Flag a listing as applied to. The only mutation after insertion.
    fn mark_applied(&self, id: &Uuid) -> Result<Listing, StoreError>;

    /// Most recently discovered listings first
    fn recent(&self, limit: usize) -> Result<Vec<Listing>, StoreError>;
}

const LISTING_COLUMNS: &str = "id, title, company, description, location, salary, job_type, source, url,
     requirements, benefits, matched_keywords, relevance_score, discovered_at, applied, applied_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: &str) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = SqliteStore {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS listings (
                id BLOB PRIMARY KEY,
                title TEXT NOT NULL,
                company TEXT NOT NULL,
                description TEXT NOT NULL,
                location TEXT NOT NULL,
                salary TEXT,
                job_type TEXT NOT NULL,
                source TEXT NOT NULL,
                url TEXT NOT NULL,
                requirements TEXT NOT NULL DEFAULT '[]',
                benefits TEXT NOT NULL DEFAULT '[]',
                matched_keywords TEXT NOT NULL DEFAULT '[]',
                relevance_score REAL NOT NULL DEFAULT 0,
                discovered_at TEXT NOT NULL,
                applied INTEGER NOT NULL DEFAULT 0,
                applied_at TEXT,
                title_key TEXT NOT NULL,
                company_key TEXT NOT NULL,
                UNIQUE (title_key, company_key, source)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_discovered_at ON listings(discovered_at)",
            [],
        )?;

        Ok(())
    }

    fn read_listing(row: &Row<'_>) -> rusqlite::Result<Listing> {
        let source: String = row.get(7)?;
        let source = source
            .parse::<Platform>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, e.into()))?;

        Ok(Listing {
            id: row.get(0)?,
            title: row.get(1)?,
            company: row.get(2)?,
            description: row.get(3)?,
            location: row.get(4)?,
            salary: row.get(5)?,
            job_type: row.get(6)?,
            source,
            url: row.get(8)?,
            requirements: json_list(&row.get::<_, String>(9)?),
            benefits: json_list(&row.get::<_, String>(10)?),
            matched_keywords: json_list(&row.get::<_, String>(11)?),
            relevance_score: row.get(12)?,
            discovered_at: row.get(13)?,
            applied: row.get(14)?,
            applied_at: row.get(15)?,
        })
    }

    fn get(conn: &Connection, id: &Uuid) -> Result<Option<Listing>, StoreError> {
        let listing = conn
            .query_row(
                &format!("SELECT {} FROM listings WHERE id = ?1", LISTING_COLUMNS),
                params![id],
                Self::read_listing,
            )
            .optional()?;
        Ok(listing)
    }
}

fn json_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn to_json(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl ListingStore for SqliteStore {
    fn find_by_signature(&self, signature: &Signature) -> Result<Option<Listing>, StoreError> {
        let conn = self.conn()?;
        let listing = conn
            .query_row(
                &format!(
                    "SELECT {} FROM listings WHERE title_key = ?1 AND company_key = ?2 AND source = ?3",
                    LISTING_COLUMNS
                ),
                params![&signature.title, &signature.company, signature.source.as_str()],
                Self::read_listing,
            )
            .optional()?;
        Ok(listing)
    }

    fn insert(&self, listing: &Listing) -> Result<(), StoreError> {
        let signature = Signature::of(listing);
        let conn = self.conn()?;

        let result = conn.execute(
            "INSERT INTO listings (
                id, title, company, description, location, salary, job_type, source, url,
                requirements, benefits, matched_keywords, relevance_score, discovered_at,
                applied, applied_at, title_key, company_key
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                listing.id,
                &listing.title,
                &listing.company,
                &listing.description,
                &listing.location,
                &listing.salary,
                &listing.job_type,
                listing.source.as_str(),
                &listing.url,
                to_json(&listing.requirements),
                to_json(&listing.benefits),
                to_json(&listing.matched_keywords),
                listing.relevance_score,
                listing.discovered_at,
                listing.applied,
                listing.applied_at,
                &signature.title,
                &signature.company,
            ],
        );

        match result {
            Ok(_) => {
                tracing::info!("Saved new job: {} at {}", listing.title, listing.company);
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateKey {
                title: listing.title.clone(),
                company: listing.company.clone(),
                platform: listing.source,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn mark_applied(&self, id: &Uuid) -> Result<Listing, StoreError> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE listings SET applied = 1, applied_at = ?1 WHERE id = ?2",
            params![Utc::now(), id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(*id));
        }

        Self::get(&conn, id)?.ok_or(StoreError::NotFound(*id))
    }

    fn recent(&self, limit: usize) -> Result<Vec<Listing>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM listings ORDER BY discovered_at DESC LIMIT ?1",
            LISTING_COLUMNS
        ))?;

        let listings = stmt
            .query_map(params![limit as i64], Self::read_listing)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(listings)
    }
}
