use crate::{
    error::{Result, StoreError},
    schema,
};
use fiesta_solc::{
    abi::{extract, FunctionSelector},
    cache::{CompiledOutput, Strategy},
    dataset::ContractArtifact,
    pool::OutputSink,
    CompilerOutput,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    collections::BTreeSet,
    error::Error,
    path::Path,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

/// How long a writer waits for a lock held by another connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// A row of `contract_hashes`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRow {
    pub hash: String,
    pub name: String,
    pub version: String,
    /// The tag of the strategy that produced the indexed output
    pub source: Option<String>,
}

impl ContractRow {
    pub fn new(artifact: &ContractArtifact, tag: Strategy) -> Self {
        Self {
            hash: artifact.hash.clone(),
            name: artifact.name.clone(),
            version: artifact.version.clone(),
            source: Some(tag.tag().to_string()),
        }
    }
}

/// What [`SignatureStore::index_artifact`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indexed {
    /// The contract row and this many selectors were written
    Recorded(usize),
    /// The artifact has no valid cache record
    NotCompiled,
}

/// The SQLite index of compiled contracts and their function selectors
///
/// Every write is an upsert keyed by the primary key of its table, so indexing the same artifact
/// again replaces its rows. The store can be shared by all workers of a run.
#[derive(Debug)]
pub struct SignatureStore {
    conn: Mutex<Connection>,
}

impl SignatureStore {
    /// Opens or creates the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::trace!("opening signature store \"{}\"", path.display());
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(schema::PRAGMAS)?;
        Self::bootstrap(conn)
    }

    /// A private in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.execute_batch(schema::BOOTSTRAP)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // a panic while holding the lock can not leave a half applied statement behind
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn upsert_contract(&self, row: &ContractRow) -> Result<()> {
        self.conn().execute(
            "INSERT INTO contract_hashes(hash, name, version, source) VALUES (?1, ?2, ?3, ?4)",
            params![row.hash, row.name, row.version, row.source],
        )?;
        Ok(())
    }

    /// Upserts all `selectors`, which are attributed to the `contract` row, in one transaction
    pub fn upsert_functions(
        &self,
        contract: &ContractRow,
        selectors: &BTreeSet<FunctionSelector>,
    ) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        insert_functions(&tx, contract, selectors)?;
        tx.commit()?;
        Ok(selectors.len())
    }

    /// Indexes a compile output: the contract row first, then its selectors
    pub fn record(
        &self,
        artifact: &ContractArtifact,
        tag: Strategy,
        output: &CompilerOutput,
    ) -> Result<usize> {
        let row = ContractRow::new(artifact, tag);
        let selectors = extract(&artifact.hash, output);

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO contract_hashes(hash, name, version, source) VALUES (?1, ?2, ?3, ?4)",
            params![row.hash, row.name, row.version, row.source],
        )?;
        insert_functions(&tx, &row, &selectors)?;
        tx.commit()?;
        tracing::trace!("indexed {} with {} selectors", artifact.hash, selectors.len());
        Ok(selectors.len())
    }

    /// Indexes the cache record of `artifact`, if it has a valid one
    pub fn index_artifact(&self, artifact: &ContractArtifact) -> Result<Indexed> {
        let Some(record) = CompiledOutput::read(&artifact.dir)? else {
            return Ok(Indexed::NotCompiled)
        };
        let output = record.output()?;
        if output.is_empty() {
            return Ok(Indexed::NotCompiled)
        }
        Ok(Indexed::Recorded(self.record(artifact, record.tag, &output)?))
    }

    /// Rows of the `sighashes` view: selectors by the number of functions declaring them
    pub fn selector_frequency(&self, limit: Option<usize>) -> Result<Vec<(String, usize)>> {
        self.frequency("SELECT sighash, count FROM sighashes", limit)
    }

    /// Rows of the `versions` view: compiler versions by the number of indexed contracts
    pub fn version_frequency(&self, limit: Option<usize>) -> Result<Vec<(String, usize)>> {
        self.frequency("SELECT version, count FROM versions", limit)
    }

    fn frequency(&self, query: &str, limit: Option<usize>) -> Result<Vec<(String, usize)>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("{query} LIMIT ?1"))?;
        let rows =
            stmt.query_map([limit], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        let frequencies = rows
            .map(|row| -> Result<(String, usize)> {
                let (key, count) = row?;
                Ok((key, to_count(count)?))
            })
            .collect();
        frequencies
    }

    /// All distinct selectors, sorted
    pub fn unique_selectors(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT DISTINCT sighash FROM contract_functions ORDER BY sighash")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn contract(&self, hash: &str) -> Result<Option<ContractRow>> {
        let row = self
            .conn()
            .query_row(
                "SELECT hash, name, version, source FROM contract_hashes WHERE hash = ?1",
                [hash],
                |row| {
                    Ok(ContractRow {
                        hash: row.get(0)?,
                        name: row.get(1)?,
                        version: row.get(2)?,
                        source: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// The selectors indexed for `hash`, sorted by file, contract and signature
    pub fn functions_of(&self, hash: &str) -> Result<Vec<FunctionSelector>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT hash, file, contract, sighash FROM contract_functions WHERE hash = ?1
             ORDER BY file, contract, sighash",
        )?;
        let rows = stmt.query_map([hash], |row| {
            Ok(FunctionSelector {
                hash: row.get(0)?,
                file: row.get(1)?,
                contract: row.get(2)?,
                signature: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of indexed contracts
    pub fn contract_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn().query_row("SELECT COUNT(*) FROM contract_hashes", [], |row| row.get(0))?;
        to_count(count)
    }
}

impl OutputSink for SignatureStore {
    fn write(
        &self,
        artifact: &ContractArtifact,
        tag: Strategy,
        output: &CompilerOutput,
    ) -> std::result::Result<(), Box<dyn Error + Send + Sync>> {
        self.record(artifact, tag, output)?;
        Ok(())
    }
}

fn insert_functions(
    conn: &Connection,
    contract: &ContractRow,
    selectors: &BTreeSet<FunctionSelector>,
) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO contract_functions(hash, name, version, file, contract, sighash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for selector in selectors {
        stmt.execute(params![
            selector.hash,
            contract.name,
            contract.version,
            selector.file,
            selector.contract,
            selector.signature
        ])?;
    }
    Ok(())
}

fn to_count(count: i64) -> Result<usize> {
    usize::try_from(count).map_err(|_| StoreError::Count(count))
}
