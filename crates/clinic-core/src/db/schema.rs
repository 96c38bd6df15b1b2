//! SQLite schema definition.

/// Complete database schema for the clinic core.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Doctors
-- ============================================================================

CREATE TABLE IF NOT EXISTS doctors (
    id TEXT PRIMARY KEY,
    public_id TEXT UNIQUE,                        -- NULL until first approval
    email TEXT NOT NULL,
    profile TEXT NOT NULL,                        -- JSON DoctorProfile
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'approved', 'rejected')),
    rejection_reason TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_doctors_status ON doctors(status);
CREATE INDEX IF NOT EXISTS idx_doctors_email ON doctors(email);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    public_id TEXT UNIQUE,                        -- NULL until first approval
    email TEXT NOT NULL,
    profile TEXT NOT NULL,                        -- JSON PatientProfile
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'approved', 'rejected')),
    rejection_reason TEXT,
    cured INTEGER NOT NULL DEFAULT 0,
    assigned_doctor_id TEXT NOT NULL REFERENCES doctors(id),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_status ON patients(status);
CREATE INDEX IF NOT EXISTS idx_patients_assigned_doctor ON patients(assigned_doctor_id);

-- ============================================================================
-- Invite Tokens (never deleted; consumed_at marks terminal state)
-- ============================================================================

CREATE TABLE IF NOT EXISTS invite_tokens (
    token TEXT PRIMARY KEY,
    role TEXT NOT NULL CHECK (role IN ('doctor', 'patient')),
    issuing_doctor_id TEXT REFERENCES doctors(id),
    recipient_email TEXT,
    issued_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    consumed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_invites_issuer ON invite_tokens(issuing_doctor_id);

-- ============================================================================
-- Vitals Records
-- ============================================================================

CREATE TABLE IF NOT EXISTS vitals_records (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    recorded_by TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    pulse INTEGER,
    heart_rate INTEGER,
    temperature REAL,
    bp_systolic INTEGER,
    bp_diastolic INTEGER,
    blood_sugar REAL,
    weight_kg REAL,
    height_cm REAL,
    naadi TEXT,
    thegi TEXT,
    diagnosis TEXT,
    bmi REAL,
    bmr REAL,
    tdee REAL,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_vitals_patient_recorded
    ON vitals_records(patient_id, recorded_at DESC);

-- ============================================================================
-- Diet Templates (weekly plans keyed by diagnosis)
-- ============================================================================

CREATE TABLE IF NOT EXISTS diet_templates (
    diagnosis_key TEXT PRIMARY KEY,
    days TEXT NOT NULL,                           -- JSON array of DayPlan
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Diet Entries (meal ledger; one slot per meal type per day)
-- ============================================================================

CREATE TABLE IF NOT EXISTS diet_entries (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    date TEXT NOT NULL,                           -- YYYY-MM-DD
    meal_type TEXT NOT NULL
        CHECK (meal_type IN ('breakfast', 'lunch', 'dinner', 'snack')),
    description TEXT,
    calories INTEGER,
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (patient_id, date, meal_type)
);

CREATE INDEX IF NOT EXISTS idx_diet_entries_patient_date ON diet_entries(patient_id, date);

-- ============================================================================
-- Audit Log (append-only hash chain)
-- ============================================================================

CREATE TABLE IF NOT EXISTS audit_log (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    entity_kind TEXT NOT NULL CHECK (entity_kind IN ('doctor', 'patient')),
    entity_id TEXT NOT NULL,
    from_status TEXT NOT NULL,
    to_status TEXT NOT NULL,
    actor_id TEXT NOT NULL,
    reason TEXT,
    prev_hash TEXT,
    entry_hash TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_log(entity_kind, entity_id);
"#;
