//! Corpus repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Expose the write operations extraction needs (texts, words, concepts,
//!   phrasemes, phraseme links) and the lookups linking depends on.
//! - Keep SQL inside the persistence boundary.
//!
//! # Invariants
//! - Uniqueness (`concepts.url`, `words(text_id, xml_id)`,
//!   `phraseme_words(phraseme_id, position)`) is enforced by the schema, so a
//!   violating write surfaces as `RepoError::Db`.
//! - Word lookups are always scoped to one text.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::corpus::{
    ConceptId, CorpusStats, NewPhraseme, NewWord, Phraseme, PhrasemeId, PhrasemeWordLink,
    TextId, TextMetadata, Word, WordId,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const REQUIRED_TABLES: [&str; 5] = ["texts", "concepts", "words", "phrasemes", "phraseme_words"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from corpus persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error, including constraint violations.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "corpus repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "corpus repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for corpus extraction.
pub trait CorpusRepository {
    fn create_text(&self, metadata: &TextMetadata) -> RepoResult<TextId>;
    fn create_word(&self, word: &NewWord) -> RepoResult<WordId>;
    /// Finds a word by its source-stable id within one text.
    fn find_word_by_stable_id(&self, text_id: TextId, xml_id: &str) -> RepoResult<Option<WordId>>;
    fn create_concept(&self, url: &str) -> RepoResult<ConceptId>;
    fn find_concept_by_url(&self, url: &str) -> RepoResult<Option<ConceptId>>;
    fn create_phraseme(&self, phraseme: &NewPhraseme) -> RepoResult<PhrasemeId>;
    fn create_phraseme_word_link(&self, link: &PhrasemeWordLink) -> RepoResult<()>;
    /// Words of one text ordered by insertion.
    fn list_words(&self, text_id: TextId) -> RepoResult<Vec<Word>>;
    /// Phrasemes of one text ordered by insertion.
    fn list_phrasemes(&self, text_id: TextId) -> RepoResult<Vec<Phraseme>>;
    /// Links of one phraseme ordered by position.
    fn list_phraseme_links(&self, phraseme_id: PhrasemeId) -> RepoResult<Vec<PhrasemeWordLink>>;
    fn corpus_stats(&self) -> RepoResult<CorpusStats>;
}

/// SQLite-backed corpus repository.
///
/// Borrows a plain connection, a transaction or a savepoint; all three deref
/// to `Connection`, which is how the batch driver scopes writes.
pub struct SqliteCorpusRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCorpusRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_corpus_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CorpusRepository for SqliteCorpusRepository<'_> {
    fn create_text(&self, metadata: &TextMetadata) -> RepoResult<TextId> {
        self.conn.execute(
            "INSERT INTO texts (author, title, not_before, not_after)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                metadata.author.as_str(),
                metadata.title.as_str(),
                metadata.not_before.as_str(),
                metadata.not_after.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn create_word(&self, word: &NewWord) -> RepoResult<WordId> {
        self.conn.execute(
            "INSERT INTO words (
                text_id,
                xml_id,
                occurrence,
                lemma,
                concept_id,
                context
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                word.text_id,
                word.xml_id.as_str(),
                word.occurrence.as_str(),
                word.lemma.as_deref(),
                word.concept_id,
                word.context.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_word_by_stable_id(&self, text_id: TextId, xml_id: &str) -> RepoResult<Option<WordId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM words WHERE text_id = ?1 AND xml_id = ?2;",
                params![text_id, xml_id],
                |row| row.get::<_, WordId>(0),
            )
            .optional()?;
        Ok(id)
    }

    fn create_concept(&self, url: &str) -> RepoResult<ConceptId> {
        self.conn
            .execute("INSERT INTO concepts (url) VALUES (?1);", [url])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_concept_by_url(&self, url: &str) -> RepoResult<Option<ConceptId>> {
        let id = self
            .conn
            .query_row("SELECT id FROM concepts WHERE url = ?1;", [url], |row| {
                row.get::<_, ConceptId>(0)
            })
            .optional()?;
        Ok(id)
    }

    fn create_phraseme(&self, phraseme: &NewPhraseme) -> RepoResult<PhrasemeId> {
        self.conn.execute(
            "INSERT INTO phrasemes (text_id, normalized_form, concept_url)
             VALUES (?1, ?2, ?3);",
            params![
                phraseme.text_id,
                phraseme.normalized_form.as_str(),
                phraseme.concept_url.as_deref(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn create_phraseme_word_link(&self, link: &PhrasemeWordLink) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO phraseme_words (phraseme_id, word_id, position)
             VALUES (?1, ?2, ?3);",
            params![link.phraseme_id, link.word_id, link.position],
        )?;
        Ok(())
    }

    fn list_words(&self, text_id: TextId) -> RepoResult<Vec<Word>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                text_id,
                xml_id,
                occurrence,
                lemma,
                concept_id,
                context
             FROM words
             WHERE text_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([text_id])?;
        let mut words = Vec::new();
        while let Some(row) = rows.next()? {
            words.push(parse_word_row(row)?);
        }
        Ok(words)
    }

    fn list_phrasemes(&self, text_id: TextId) -> RepoResult<Vec<Phraseme>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text_id, normalized_form, concept_url
             FROM phrasemes
             WHERE text_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([text_id])?;
        let mut phrasemes = Vec::new();
        while let Some(row) = rows.next()? {
            phrasemes.push(Phraseme {
                id: row.get("id")?,
                text_id: row.get("text_id")?,
                normalized_form: row.get("normalized_form")?,
                concept_url: row.get("concept_url")?,
            });
        }
        Ok(phrasemes)
    }

    fn list_phraseme_links(&self, phraseme_id: PhrasemeId) -> RepoResult<Vec<PhrasemeWordLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT phraseme_id, word_id, position
             FROM phraseme_words
             WHERE phraseme_id = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([phraseme_id])?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(PhrasemeWordLink {
                phraseme_id: row.get("phraseme_id")?,
                word_id: row.get("word_id")?,
                position: row.get("position")?,
            });
        }
        Ok(links)
    }

    fn corpus_stats(&self) -> RepoResult<CorpusStats> {
        let stats = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM texts),
                (SELECT COUNT(*) FROM words),
                (SELECT COUNT(*) FROM concepts),
                (SELECT COUNT(*) FROM phrasemes),
                (SELECT COUNT(*) FROM phraseme_words);",
            [],
            |row| {
                Ok(CorpusStats {
                    texts: row.get(0)?,
                    words: row.get(1)?,
                    concepts: row.get(2)?,
                    phrasemes: row.get(3)?,
                    phraseme_words: row.get(4)?,
                })
            },
        )?;
        Ok(stats)
    }
}

fn parse_word_row(row: &Row<'_>) -> RepoResult<Word> {
    Ok(Word {
        id: row.get("id")?,
        text_id: row.get("text_id")?,
        xml_id: row.get("xml_id")?,
        occurrence: row.get("occurrence")?,
        lemma: row.get("lemma")?,
        concept_id: row.get("concept_id")?,
        context: row.get("context")?,
    })
}

fn ensure_corpus_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
