pub const SCHEMA: &str = r#"
-- Users and groups share one slug space: a URL's first segment names either
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK (kind IN ('user', 'group')),
    slug TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Role records; no row means a non-privileged associate
CREATE TABLE IF NOT EXISTS memberships (
    user_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    group_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (role IN ('editor', 'admin')),
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, group_id)
);

-- Repositories
CREATE TABLE IF NOT EXISTS repositories (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    description TEXT,

    -- Visibility
    privacy TEXT NOT NULL DEFAULT 'public' CHECK (privacy IN ('public', 'private')),
    has_toc INTEGER NOT NULL DEFAULT 1,

    -- Counter caches, recomputed from social_actions on every change
    stars_count INTEGER NOT NULL DEFAULT 0 CHECK (stars_count >= 0),
    watches_count INTEGER NOT NULL DEFAULT 0 CHECK (watches_count >= 0),

    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    UNIQUE(owner_id, slug)
);

-- One row per (repository, user, action type); the source of truth for counters
CREATE TABLE IF NOT EXISTS social_actions (
    repository_id TEXT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    action_type TEXT NOT NULL CHECK (action_type IN ('star', 'watch')),
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (repository_id, user_id, action_type)
);

-- Documents inside a repository
CREATE TABLE IF NOT EXISTS docs (
    id TEXT PRIMARY KEY,
    repository_id TEXT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    slug TEXT NOT NULL,
    title TEXT NOT NULL,
    body TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    UNIQUE(repository_id, slug)
);

-- Tokens are auth credentials; non-admin tokens must belong to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- 8 hex chars, stored in clear for lookup
    is_admin INTEGER NOT NULL DEFAULT 0,  -- admin tokens only access /api/v1/admin/* routes

    -- User binding (required for non-admin tokens, NULL only for admin tokens)
    user_id TEXT REFERENCES accounts(id) ON DELETE CASCADE,

    -- Lifecycle
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,            -- NULL = never
    last_used_at TEXT
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_repositories_owner ON repositories(owner_id);
CREATE INDEX IF NOT EXISTS idx_memberships_group ON memberships(group_id);
CREATE INDEX IF NOT EXISTS idx_social_actions_count ON social_actions(repository_id, action_type);
CREATE INDEX IF NOT EXISTS idx_social_actions_user ON social_actions(user_id);
CREATE INDEX IF NOT EXISTS idx_docs_repository ON docs(repository_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
"#;
