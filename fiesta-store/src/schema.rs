//! Tables and views of the signature database

/// Executed on every open, all statements are idempotent
pub(crate) const BOOTSTRAP: &str = "
CREATE TABLE IF NOT EXISTS contract_hashes (
    hash    TEXT PRIMARY KEY ON CONFLICT REPLACE,
    name    TEXT NOT NULL,
    version TEXT NOT NULL,
    source  TEXT
) STRICT;

CREATE TABLE IF NOT EXISTS contract_functions (
    hash     TEXT,
    name     TEXT,
    version  TEXT,
    file     TEXT,
    contract TEXT,
    sighash  TEXT NOT NULL,
    PRIMARY KEY (hash, file, sighash) ON CONFLICT REPLACE
) STRICT;

CREATE VIEW IF NOT EXISTS sighashes AS
    SELECT sighash, COUNT(sighash) AS count FROM contract_functions
    GROUP BY sighash ORDER BY COUNT(sighash) DESC, sighash;

CREATE VIEW IF NOT EXISTS versions AS
    SELECT version, COUNT(version) AS count FROM contract_hashes
    GROUP BY version ORDER BY COUNT(version) DESC, version;
";

/// Write ahead logging, readers do not block the writing workers
pub(crate) const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
";
