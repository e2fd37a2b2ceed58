//! SQL schema for the thesis SQLite store.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,   -- identity provider id
    email       TEXT NOT NULL,
    first_name  TEXT NOT NULL DEFAULT '',
    last_name   TEXT NOT NULL DEFAULT '',
    username    TEXT,
    role        TEXT NOT NULL,      -- fixed at insert
    school      TEXT,
    department  TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS student_profiles (
    user_id          TEXT PRIMARY KEY,
    supervisor_id    TEXT,          -- weak reference to users.user_id
    research_topic   TEXT,
    research_summary TEXT,
    status           TEXT NOT NULL DEFAULT 'current',
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS supervisor_profiles (
    user_id     TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    school      TEXT NOT NULL DEFAULT '',
    department  TEXT NOT NULL DEFAULT '',
    specialties TEXT NOT NULL DEFAULT '[]',   -- JSON array of lower-case tags
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS proposals (
    proposal_id            TEXT PRIMARY KEY,
    student_id             TEXT NOT NULL,
    topic                  TEXT NOT NULL,
    summary                TEXT,
    status                 TEXT NOT NULL DEFAULT 'pending',
    assigned_supervisor_id TEXT,
    feedback               TEXT,
    reviewed_by            TEXT,
    submitted_at           TEXT NOT NULL,
    reviewed_at            TEXT
);

-- Assignment history. Rows are only ever closed by setting superseded_at.
CREATE TABLE IF NOT EXISTS assignments (
    assignment_id TEXT PRIMARY KEY,
    proposal_id   TEXT NOT NULL REFERENCES proposals(proposal_id),
    supervisor_id TEXT NOT NULL,
    source        TEXT NOT NULL,    -- 'auto' | 'coordinator'
    assigned_by   TEXT,
    recorded_at   TEXT NOT NULL,
    superseded_at TEXT
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    kind            TEXT NOT NULL,
    title           TEXT NOT NULL,
    message         TEXT NOT NULL,
    from_user_id    TEXT,
    comment_id      TEXT,
    is_read         INTEGER NOT NULL DEFAULT 0,
    is_resolved     INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    read_at         TEXT,
    resolved_at     TEXT
);

CREATE TABLE IF NOT EXISTS thesis_versions (
    version_id     TEXT PRIMARY KEY,
    student_id     TEXT NOT NULL,
    version_number INTEGER NOT NULL,
    title          TEXT NOT NULL,
    notes          TEXT,
    file_url       TEXT NOT NULL,
    is_final       INTEGER NOT NULL DEFAULT 0,
    uploaded_at    TEXT NOT NULL,
    UNIQUE (student_id, version_number)
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id        TEXT PRIMARY KEY,
    student_id        TEXT NOT NULL,
    supervisor_id     TEXT NOT NULL,
    thesis_version_id TEXT REFERENCES thesis_versions(version_id),
    content           TEXT NOT NULL,
    is_resolved       INTEGER NOT NULL DEFAULT 0,
    is_approved       INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL,
    resolved_at       TEXT,
    approved_at       TEXT
);

CREATE TABLE IF NOT EXISTS admin_sessions (
    token_digest TEXT PRIMARY KEY,  -- hex SHA-256 of the bearer token
    email        TEXT NOT NULL,
    issued_at    TEXT NOT NULL,
    expires_at   TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS assignments_current_idx
    ON assignments(proposal_id) WHERE superseded_at IS NULL;
CREATE UNIQUE INDEX IF NOT EXISTS thesis_versions_final_idx
    ON thesis_versions(student_id) WHERE is_final = 1;
CREATE INDEX IF NOT EXISTS proposals_status_idx     ON proposals(status);
CREATE INDEX IF NOT EXISTS notifications_user_idx   ON notifications(user_id);
CREATE INDEX IF NOT EXISTS notifications_comment_idx ON notifications(comment_id);
CREATE INDEX IF NOT EXISTS comments_student_idx     ON comments(student_id);

PRAGMA user_version = 1;
";
