//! SQL schema for the postwatch SQLite store.
//!
//! Executed at connection startup. Every statement is guarded by
//! `IF NOT EXISTS`, so opening an existing database leaves it untouched.
//! There is no migration path; `user_version` records the layout in use.

pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One immutable row per post. Never updated or deleted.
CREATE TABLE IF NOT EXISTS submissions (
    id          TEXT PRIMARY KEY,
    author      TEXT NOT NULL,
    created_utc INTEGER NOT NULL,   -- Unix seconds, platform creation time
    name        TEXT NOT NULL,      -- canonical name, e.g. t3_abc123
    permalink   TEXT NOT NULL,
    selftext    TEXT,
    title       TEXT NOT NULL
);

-- One row per observation of a post.
CREATE TABLE IF NOT EXISTS stats (
    submission_id TEXT NOT NULL,
    time_utc      INTEGER NOT NULL, -- Unix seconds, sample time
    ups           INTEGER NOT NULL,
    downs         INTEGER NOT NULL,
    num_comments  INTEGER NOT NULL,
    PRIMARY KEY (submission_id, time_utc)
);

CREATE INDEX IF NOT EXISTS submissions_created_idx ON submissions(created_utc);

PRAGMA user_version = 1;
";
