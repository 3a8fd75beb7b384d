//! Catalog schema. Applied by `ProblemStore::migrate`; every statement is idempotent.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS problems (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    source          TEXT NOT NULL DEFAULT 'leetcode',
    source_id       TEXT NOT NULL,
    slug            TEXT NOT NULL,
    title           TEXT NOT NULL,
    difficulty      TEXT NOT NULL,
    description     TEXT NOT NULL DEFAULT '',
    examples        TEXT NOT NULL DEFAULT '[]',
    constraints     TEXT NOT NULL DEFAULT '[]',
    hints           TEXT NOT NULL DEFAULT '[]',
    python3_snippet TEXT NOT NULL DEFAULT '',
    created_at      TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at      TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(source, slug)
);

CREATE TABLE IF NOT EXISTS topics (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS problem_topics (
    problem_id INTEGER NOT NULL REFERENCES problems(id) ON DELETE CASCADE,
    topic_id   INTEGER NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
    PRIMARY KEY (problem_id, topic_id)
);

CREATE VIRTUAL TABLE IF NOT EXISTS problems_fts USING fts5(
    title,
    description,
    content=problems,
    content_rowid=id
);

CREATE TRIGGER IF NOT EXISTS problems_ai AFTER INSERT ON problems BEGIN
    INSERT INTO problems_fts(rowid, title, description) VALUES (new.id, new.title, new.description);
END;

CREATE TRIGGER IF NOT EXISTS problems_ad AFTER DELETE ON problems BEGIN
    INSERT INTO problems_fts(problems_fts, rowid, title, description) VALUES ('delete', old.id, old.title, old.description);
END;

CREATE TRIGGER IF NOT EXISTS problems_au AFTER UPDATE ON problems BEGIN
    INSERT INTO problems_fts(problems_fts, rowid, title, description) VALUES ('delete', old.id, old.title, old.description);
    INSERT INTO problems_fts(rowid, title, description) VALUES (new.id, new.title, new.description);
END;
"#;
