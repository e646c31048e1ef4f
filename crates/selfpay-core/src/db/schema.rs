//! SQLite schema definition.

/// Complete database schema for selfpay.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    first_name TEXT,
    last_name TEXT,
    phone TEXT,
    date_of_birth TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Services (billable line items)
-- ============================================================================

CREATE TABLE IF NOT EXISTS services (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    service_code TEXT NOT NULL,
    service_name TEXT NOT NULL,
    service_date TEXT NOT NULL,
    original_cents INTEGER NOT NULL CHECK (original_cents >= 0),
    discounted_cents INTEGER NOT NULL CHECK (discounted_cents >= 0 AND discounted_cents <= original_cents),
    insurance_denial_reason TEXT,
    insurance_company_phone TEXT,
    is_paid INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_services_patient ON services(patient_id);
CREATE INDEX IF NOT EXISTS idx_services_patient_unpaid ON services(patient_id, is_paid);

-- ============================================================================
-- Magic Links (one-time sign-in tokens)
-- ============================================================================

CREATE TABLE IF NOT EXISTS magic_links (
    id TEXT PRIMARY KEY,
    token TEXT NOT NULL UNIQUE,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    expires_at TEXT NOT NULL,
    used INTEGER NOT NULL DEFAULT 0,
    used_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_magic_links_patient ON magic_links(patient_id);

-- ============================================================================
-- Insurance Cards and Update History
-- ============================================================================

CREATE TABLE IF NOT EXISTS insurance_cards (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    front_image_url TEXT,
    back_image_url TEXT,
    insurance_company TEXT,
    policy_number TEXT,
    group_number TEXT,
    member_name TEXT,
    member_id TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_insurance_cards_patient_active ON insurance_cards(patient_id, is_active);

CREATE TABLE IF NOT EXISTS insurance_updates (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    insurance_card_id TEXT REFERENCES insurance_cards(id),
    update_kind TEXT NOT NULL CHECK (update_kind IN ('photo_upload', 'manual_entry', 'both')),
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_insurance_updates_patient ON insurance_updates(patient_id);

-- ============================================================================
-- Payments
-- ============================================================================

-- The UNIQUE constraint on processor_intent_id is the idempotency guard:
-- two confirmations of the same intent cannot both insert a row.
CREATE TABLE IF NOT EXISTS payments (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    processor_intent_id TEXT NOT NULL UNIQUE,
    amount_cents INTEGER NOT NULL CHECK (amount_cents >= 0),
    currency TEXT NOT NULL DEFAULT 'usd',
    status TEXT NOT NULL CHECK (status IN ('pending', 'succeeded', 'failed', 'canceled')),
    service_ids TEXT NOT NULL DEFAULT '[]',        -- JSON array of service IDs
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_payments_patient ON payments(patient_id);

-- ============================================================================
-- Patient Actions (append-only audit trail)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient_actions (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    action TEXT NOT NULL,
    details TEXT,                                  -- JSON blob
    ip_address TEXT,
    user_agent TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patient_actions_patient ON patient_actions(patient_id);
"#;
