//! The storage module persists listings, restaurant records, content documents
//! and summaries in SQLite.
//!
//! Every row is keyed by the restaurant name. Inserts check for an existing row
//! first, so running a stage twice never duplicates anything.

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// A restaurant seen on the listing overview and where to fetch its details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingRef {
    pub name: String,
    pub detail_url: String,
    pub image_url: Option<String>,
}

/// Structured fields taken from a restaurant's detail page.
///
/// Categorical attributes hold comma-joined tags, e.g. `"Lunch, Diner"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityRecord {
    pub name: String,
    pub website_url: Option<String>,
    pub social_url: Option<String>,
    pub address: Option<String>,
    pub meal_type: Option<String>,
    pub district: Option<String>,
    pub kind: Option<String>,
    pub price_tier: Option<String>,
}

/// Free text about a restaurant, keyed by `(name, source_url)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentDocument {
    pub name: String,
    pub source_url: String,
    pub content: Option<String>,
}

/// Row counts per table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    pub listings: usize,
    pub entities: usize,
    pub documents: usize,
    pub summaries: usize,
}

/// Storage provides database operations for the ingestion pipeline.
pub struct Storage {
    /// The underlying SQLite connection wrapped in Arc<Mutex<>> to make it thread-safe
    conn: Arc<Mutex<Connection>>,
}

impl Storage {
    /// Opens (or creates) the database at `database_path`. Use `":memory:"`
    /// for a throwaway in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot be created
    pub fn new(database_path: &str) -> Result<Self> {
        let conn = Connection::open(database_path)?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS listings (
                name TEXT PRIMARY KEY,
                detail_url TEXT NOT NULL,
                image_url TEXT NULL,
                added_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS entities (
                name TEXT PRIMARY KEY,
                website_url TEXT NULL,
                social_url TEXT NULL,
                address TEXT NULL,
                meal_type TEXT NULL,
                district TEXT NULL,
                kind TEXT NULL,
                price_tier TEXT NULL,
                added_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS documents (
                name TEXT NOT NULL,
                source_url TEXT NOT NULL,
                content TEXT NULL,
                added_at INTEGER NOT NULL,
                PRIMARY KEY (name, source_url)
            );
            CREATE TABLE IF NOT EXISTS summaries (
                name TEXT PRIMARY KEY,
                summary TEXT NOT NULL,
                added_at INTEGER NOT NULL
            );",
        )?;

        Ok(())
    }

    /// Runs `work` inside one SQLite transaction.
    ///
    /// The transaction commits when `work` returns `Ok` and rolls back when it
    /// returns `Err`, so a unit of work is stored completely or not at all.
    ///
    /// # Errors
    ///
    /// Returns the error of `work`, or an error if the transaction cannot be opened or committed
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn in_transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock().expect("Storage mutex poisoned");
        let tx = conn.transaction()?;
        let result = work(&UnitOfWork { conn: &tx })?;
        tx.commit()?;

        Ok(result)
    }

    /// Names of all known listings.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn listing_names(&self) -> Result<HashSet<String>> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        let mut stmt = conn.prepare("SELECT name FROM listings")?;
        let names: Result<HashSet<String>, rusqlite::Error> =
            stmt.query_map([], |row| row.get(0))?.collect();

        names.map_err(|e| e.into())
    }

    /// Listings whose detail page has not been acquired yet, in discovery order.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn pending_listings(&self) -> Result<Vec<ListingRef>> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT l.name, l.detail_url, l.image_url FROM listings l
             WHERE NOT EXISTS (SELECT 1 FROM entities e WHERE e.name = l.name)
             ORDER BY l.rowid ASC",
        )?;
        let listings: Result<Vec<ListingRef>, rusqlite::Error> = stmt
            .query_map([], |row| {
                Ok(ListingRef {
                    name: row.get(0)?,
                    detail_url: row.get(1)?,
                    image_url: row.get(2)?,
                })
            })?
            .collect();

        listings.map_err(|e| e.into())
    }

    /// `(name, content)` of every non-empty document of restaurants without a
    /// summary, ordered by name and then by insertion.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn unsummarized_documents(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT d.name, d.content FROM documents d
             WHERE d.content IS NOT NULL
               AND NOT EXISTS (SELECT 1 FROM summaries s WHERE s.name = d.name)
             ORDER BY d.name ASC, d.rowid ASC",
        )?;
        let documents: Result<Vec<(String, String)>, rusqlite::Error> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect();

        documents.map_err(|e| e.into())
    }

    /// Checks whether a restaurant record exists for `name`.
    ///
    /// # Returns
    ///
    /// `true` if the record is stored
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn entity_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        entity_exists(&conn, name)
    }

    /// Checks whether `name` has a document with content.
    ///
    /// # Returns
    ///
    /// `true` if a document with non-empty content is stored
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn has_content_documents(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        has_content_documents(&conn, name)
    }

    /// Checks whether `name` already has a summary.
    ///
    /// # Returns
    ///
    /// `true` if a summary is stored
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn has_summary(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        has_summary(&conn, name)
    }

    /// Gets the structured record of a restaurant.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn get_entity(&self, name: &str) -> Result<Option<EntityRecord>> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT name, website_url, social_url, address, meal_type, district, kind, price_tier
             FROM entities WHERE name = ?1",
        )?;
        let entity: Result<Option<EntityRecord>, rusqlite::Error> = stmt
            .query_row([name], |row| {
                Ok(EntityRecord {
                    name: row.get(0)?,
                    website_url: row.get(1)?,
                    social_url: row.get(2)?,
                    address: row.get(3)?,
                    meal_type: row.get(4)?,
                    district: row.get(5)?,
                    kind: row.get(6)?,
                    price_tier: row.get(7)?,
                })
            })
            .optional();

        entity.map_err(|e| anyhow::anyhow!("Unable to fetch entity row: {e}"))
    }

    /// Gets the content documents of a restaurant in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn documents_for(&self, name: &str) -> Result<Vec<ContentDocument>> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT name, source_url, content FROM documents WHERE name = ?1 ORDER BY rowid ASC",
        )?;
        let documents: Result<Vec<ContentDocument>, rusqlite::Error> = stmt
            .query_map([name], |row| {
                Ok(ContentDocument {
                    name: row.get(0)?,
                    source_url: row.get(1)?,
                    content: row.get(2)?,
                })
            })?
            .collect();

        documents.map_err(|e| e.into())
    }

    /// Gets the summary of a restaurant.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn get_summary(&self, name: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        let mut stmt = conn.prepare("SELECT summary FROM summaries WHERE name = ?1")?;
        let summary: Result<Option<String>, rusqlite::Error> =
            stmt.query_row([name], |row| row.get(0)).optional();

        summary.map_err(|e| e.into())
    }

    /// # Errors
    ///
    /// Returns an error if database operation fails
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn counts(&self) -> Result<Counts> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        let count = |table: &str| -> Result<usize> {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(usize::try_from(count)?)
        };

        Ok(Counts {
            listings: count("listings")?,
            entities: count("entities")?,
            documents: count("documents")?,
            summaries: count("summaries")?,
        })
    }

    /// Removes every row from every table.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn reset(&self) -> Result<()> {
        let mut conn = self.conn.lock().expect("Storage mutex poisoned");
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM summaries;
             DELETE FROM documents;
             DELETE FROM entities;
             DELETE FROM listings;",
        )?;
        tx.commit()?;

        Ok(())
    }
}

/// Writes issued inside [`Storage::in_transaction`].
///
/// Every insert first checks whether the row exists and reports whether it
/// actually wrote anything.
pub struct UnitOfWork<'a> {
    conn: &'a Connection,
}

impl UnitOfWork<'_> {
    /// Checks whether a listing named `name` is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub fn listing_exists(&self, name: &str) -> Result<bool> {
        let exists = self
            .conn
            .query_row("SELECT 1 FROM listings WHERE name = ?1", [name], |_| Ok(()))
            .optional()?
            .is_some();

        Ok(exists)
    }

    /// Checks whether a restaurant record exists for `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub fn entity_exists(&self, name: &str) -> Result<bool> {
        entity_exists(self.conn, name)
    }

    /// Checks whether `name` has a document with content.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub fn has_content_documents(&self, name: &str) -> Result<bool> {
        has_content_documents(self.conn, name)
    }

    /// Checks whether `name` already has a summary.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub fn has_summary(&self, name: &str) -> Result<bool> {
        has_summary(self.conn, name)
    }

    /// Checks whether a document with this `(name, source_url)` key is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub fn document_exists(&self, name: &str, source_url: &str) -> Result<bool> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM documents WHERE name = ?1 AND source_url = ?2",
                params![name, source_url],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        Ok(exists)
    }

    /// Stores a discovered listing unless one with the same name exists.
    ///
    /// # Returns
    ///
    /// `true` if a row was written
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub fn insert_listing(&self, listing: &ListingRef) -> Result<bool> {
        if self.listing_exists(&listing.name)? {
            return Ok(false);
        }

        self.conn.execute(
            "INSERT INTO listings (name, detail_url, image_url, added_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                listing.name,
                listing.detail_url,
                listing.image_url,
                chrono::Utc::now().timestamp()
            ],
        )?;

        Ok(true)
    }

    /// Stores a restaurant record unless one with the same name exists.
    ///
    /// # Returns
    ///
    /// `true` if a row was written
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub fn insert_entity(&self, entity: &EntityRecord) -> Result<bool> {
        if self.entity_exists(&entity.name)? {
            return Ok(false);
        }

        self.conn.execute(
            "INSERT INTO entities (name, website_url, social_url, address, meal_type, district, kind, price_tier, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entity.name,
                entity.website_url,
                entity.social_url,
                entity.address,
                entity.meal_type,
                entity.district,
                entity.kind,
                entity.price_tier,
                chrono::Utc::now().timestamp()
            ],
        )?;

        Ok(true)
    }

    /// Appends a content document. Existing `(name, source_url)` pairs are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub fn insert_document(&self, document: &ContentDocument) -> Result<bool> {
        if self.document_exists(&document.name, &document.source_url)? {
            return Ok(false);
        }

        self.conn.execute(
            "INSERT INTO documents (name, source_url, content, added_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                document.name,
                document.source_url,
                document.content,
                chrono::Utc::now().timestamp()
            ],
        )?;

        Ok(true)
    }

    /// Stores the summary of `name` unless it already has one.
    ///
    /// # Returns
    ///
    /// `true` if a row was written
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub fn insert_summary(&self, name: &str, summary: &str) -> Result<bool> {
        if self.has_summary(name)? {
            return Ok(false);
        }

        self.conn.execute(
            "INSERT INTO summaries (name, summary, added_at) VALUES (?1, ?2, ?3)",
            params![name, summary, chrono::Utc::now().timestamp()],
        )?;

        Ok(true)
    }
}

fn entity_exists(conn: &Connection, name: &str) -> Result<bool> {
    let exists = conn
        .query_row("SELECT 1 FROM entities WHERE name = ?1", [name], |_| Ok(()))
        .optional()?
        .is_some();

    Ok(exists)
}

fn has_content_documents(conn: &Connection, name: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM documents WHERE name = ?1 AND content IS NOT NULL LIMIT 1",
            [name],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    Ok(exists)
}

fn has_summary(conn: &Connection, name: &str) -> Result<bool> {
    let exists = conn
        .query_row("SELECT 1 FROM summaries WHERE name = ?1", [name], |_| Ok(()))
        .optional()?
        .is_some();

    Ok(exists)
}
