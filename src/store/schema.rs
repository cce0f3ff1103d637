pub const SCHEMA: &str = r#"
-- Deployment records. The on-disk deployment directory is the companion of
-- every row; the "cloned" bit lives on the filesystem, not here.
CREATE TABLE IF NOT EXISTS deployments (
    id TEXT PRIMARY KEY,
    name TEXT,
    directory TEXT,
    repository TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Asynchronous jobs. seq provides submission (FIFO) order.
CREATE TABLE IF NOT EXISTS jobs (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    deployment_id TEXT NOT NULL,
    action TEXT NOT NULL,
    params TEXT NOT NULL DEFAULT '{}',
    created_at TEXT DEFAULT (datetime('now'))
);

-- Job outcomes. The primary key enforces at most one result per job;
-- a job without a result row is pending.
CREATE TABLE IF NOT EXISTS job_results (
    job_id TEXT PRIMARY KEY REFERENCES jobs(id),
    success INTEGER NOT NULL,
    output TEXT NOT NULL DEFAULT '',
    created_at TEXT DEFAULT (datetime('now'))
);
"#;
