//! The result-store relational schema (spec §4.5). String-interning
//! tables are all `(id, value unique)`; `crashes` and its satellite
//! tables carry foreign keys into the interners.
//!
//! `results` isn't named in spec §4.5's table list, but §4.7's two-stage
//! ack ("allocate `result_id`; if status is `crash`, allocate `crash_id`
//! …") implies a row exists for every result, crash or not — recorded as
//! a resolved open question in DESIGN.md.
//!
//! Spec §4.5 also names a `streams` interner table, but nothing this crate
//! stores has a string worth interning under that name: every crash-detail
//! field it extracts already has its own dedicated interner (`descs`,
//! `exception_types`, …), and none of them represent a distinct network
//! "stream". Dropped rather than carried as a dead table — see DESIGN.md.

pub const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS descs (id INTEGER PRIMARY KEY, value TEXT UNIQUE NOT NULL)",
    "CREATE TABLE IF NOT EXISTS exception_types (id INTEGER PRIMARY KEY, value TEXT UNIQUE NOT NULL)",
    "CREATE TABLE IF NOT EXISTS exception_subtypes (id INTEGER PRIMARY KEY, value TEXT UNIQUE NOT NULL)",
    "CREATE TABLE IF NOT EXISTS classifications (id INTEGER PRIMARY KEY, value TEXT UNIQUE NOT NULL)",
    "CREATE TABLE IF NOT EXISTS hash_strings (id INTEGER PRIMARY KEY, value TEXT UNIQUE NOT NULL)",
    "CREATE TABLE IF NOT EXISTS result_strings (id INTEGER PRIMARY KEY, value TEXT UNIQUE NOT NULL)",
    "CREATE TABLE IF NOT EXISTS functions (id INTEGER PRIMARY KEY, value TEXT UNIQUE NOT NULL)",
    "CREATE TABLE IF NOT EXISTS templates (id TEXT PRIMARY KEY, raw_path TEXT NOT NULL, created_at TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS modules (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        checksum TEXT NOT NULL,
        size TEXT,
        timestamp TEXT,
        version TEXT,
        UNIQUE(name, checksum)
    )",
    "CREATE TABLE IF NOT EXISTS results (
        id TEXT PRIMARY KEY,
        test_case_id TEXT NOT NULL,
        result_string_id INTEGER NOT NULL REFERENCES result_strings(id),
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS crashes (
        id TEXT PRIMARY KEY,
        result_id TEXT NOT NULL REFERENCES results(id),
        timestamp TEXT NOT NULL,
        hash_string_id INTEGER REFERENCES hash_strings(id),
        desc_id INTEGER REFERENCES descs(id),
        exception_type_id INTEGER REFERENCES exception_types(id),
        exception_subtype_id INTEGER REFERENCES exception_subtypes(id),
        classification_id INTEGER REFERENCES classifications(id),
        template_id TEXT REFERENCES templates(id),
        raw_crash_path TEXT NOT NULL,
        raw_debug_path TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS stacktraces (
        id INTEGER PRIMARY KEY,
        crash_id TEXT NOT NULL REFERENCES crashes(id)
    )",
    "CREATE TABLE IF NOT EXISTS stackframes (
        id INTEGER PRIMARY KEY,
        stacktrace_id INTEGER NOT NULL REFERENCES stacktraces(id),
        frame_index INTEGER NOT NULL,
        module_id INTEGER REFERENCES modules(id),
        function_id INTEGER REFERENCES functions(id),
        offset TEXT,
        raw TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS loaded_modules (
        id INTEGER PRIMARY KEY,
        crash_id TEXT NOT NULL REFERENCES crashes(id),
        module_id INTEGER NOT NULL REFERENCES modules(id),
        base_address TEXT NOT NULL,
        syms_loaded INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS register_dumps (
        id INTEGER PRIMARY KEY,
        crash_id TEXT NOT NULL REFERENCES crashes(id),
        name TEXT NOT NULL,
        value INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS disasm (
        id INTEGER PRIMARY KEY,
        crash_id TEXT NOT NULL REFERENCES crashes(id),
        instr_index INTEGER NOT NULL,
        text TEXT NOT NULL
    )",
    // Named in spec §4.5's table list with no described write path;
    // kept empty for a future crash-diffing feature.
    "CREATE TABLE IF NOT EXISTS diffs (
        id INTEGER PRIMARY KEY,
        crash_id TEXT NOT NULL REFERENCES crashes(id),
        detail TEXT NOT NULL
    )",
];
