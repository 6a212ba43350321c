//! SQL schema for the skindex SQLite store.
//!
//! Executed once at connection startup. Tables and keys match the hosted
//! backend so both can be swapped behind the same trait.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Read-only catalog.
CREATE TABLE IF NOT EXISTS skins (
    id          TEXT PRIMARY KEY,
    name        TEXT,
    brawler     TEXT,
    category    TEXT,
    rarity      TEXT,
    img_path    TEXT,
    updated_at  TEXT              -- RFC 3339 UTC
);

-- Private ownership. No foreign key: ids may outlive catalog rows.
CREATE TABLE IF NOT EXISTS user_skins (
    user_id     TEXT NOT NULL,
    skin_id     TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (user_id, skin_id)
);

CREATE TABLE IF NOT EXISTS public_profiles (
    user_id       TEXT PRIMARY KEY,
    display_name  TEXT,
    bio           TEXT,
    is_public     INTEGER NOT NULL DEFAULT 0,
    show_owned    INTEGER NOT NULL DEFAULT 1,
    updated_at    TEXT
);

-- Published snapshot of user_skins.
CREATE TABLE IF NOT EXISTS public_user_skins (
    user_id     TEXT NOT NULL,
    skin_id     TEXT NOT NULL,
    UNIQUE (user_id, skin_id)
);

CREATE INDEX IF NOT EXISTS skins_order_idx       ON skins(brawler, name);
CREATE INDEX IF NOT EXISTS profiles_updated_idx  ON public_profiles(updated_at);

PRAGMA user_version = 1;
";
