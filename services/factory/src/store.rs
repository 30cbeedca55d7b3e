//! Vendor record store
//!
//! SQLite-backed persistence for vendors, roles, login codes, chaos state,
//! and pairing requests. The pool is the only synchronization point in the
//! service: chaos resolution and connection matching run inside explicit
//! transactions so concurrent callers cannot interleave partial updates;
//! everything else is a single-statement read or write.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use types::chaos::{Chaos, ChaosKind};
use types::connection::ConnectionView;
use types::ids::{ApiKey, FixCode};
use types::vendor::{Role, Vendor};

const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS vendor (
        id TEXT PRIMARY KEY,
        api_key TEXT NOT NULL UNIQUE,
        name TEXT,
        email TEXT,
        phone TEXT,
        website TEXT,
        created TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS role (
        vendor_id TEXT NOT NULL,
        role TEXT NOT NULL,
        PRIMARY KEY (vendor_id, role)
    )",
    "CREATE TABLE IF NOT EXISTS auth_code (
        vendor_id TEXT PRIMARY KEY,
        code TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS chaos (
        vendor_id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        fix_code TEXT,
        initiated TEXT NOT NULL,
        fixed TEXT
    )",
    "CREATE TABLE IF NOT EXISTS connection (
        vendor1 TEXT NOT NULL,
        vendor2 TEXT,
        purpose TEXT NOT NULL,
        created TEXT NOT NULL,
        rating INTEGER,
        PRIMARY KEY (vendor1, purpose)
    )",
];

/// Outcome of a chaos challenge-response attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The credential in the report URL matches no vendor.
    UnknownVendor,
    /// The vendor exists but no fault is active.
    NoChaos,
    /// A fault is active but the supplied code does not match; state kept.
    Unresolved,
    /// The fault was cleared and the fix code consumed.
    Resolved,
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

#[derive(sqlx::FromRow)]
struct VendorRow {
    id: String,
    api_key: String,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    website: Option<String>,
    created: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ChaosRow {
    kind: String,
    fix_code: Option<String>,
    initiated: DateTime<Utc>,
    fixed: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct ConnectionRow {
    vendor2: Option<String>,
    purpose: String,
    rating: Option<i64>,
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if necessary) the database and ensure the schema.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        for statement in TABLES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    // -- vendors ------------------------------------------------------------

    pub async fn add_vendor(&self, vendor: &Vendor) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO vendor (id, api_key, name, email, phone, website, created)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&vendor.id)
        .bind(vendor.api_key.as_str())
        .bind(&vendor.name)
        .bind(&vendor.email)
        .bind(&vendor.phone)
        .bind(&vendor.website)
        .bind(vendor.created)
        .execute(&mut *tx)
        .await?;

        for role in &vendor.roles {
            if *role != Role::Vendor {
                sqlx::query("INSERT OR IGNORE INTO role (vendor_id, role) VALUES (?, ?)")
                    .bind(&vendor.id)
                    .bind(role.as_str())
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await
    }

    pub async fn vendor_by_api_key(&self, key: &ApiKey) -> Result<Option<Vendor>, sqlx::Error> {
        let row = sqlx::query_as::<_, VendorRow>(
            "SELECT id, api_key, name, email, phone, website, created FROM vendor WHERE api_key = ?",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    pub async fn vendor_by_id(&self, id: &str) -> Result<Option<Vendor>, sqlx::Error> {
        let row = sqlx::query_as::<_, VendorRow>(
            "SELECT id, api_key, name, email, phone, website, created FROM vendor WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    pub async fn vendors(&self) -> Result<Vec<Vendor>, sqlx::Error> {
        let rows = sqlx::query_as::<_, VendorRow>(
            "SELECT id, api_key, name, email, phone, website, created FROM vendor ORDER BY created",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut vendors = Vec::with_capacity(rows.len());
        for row in rows {
            vendors.push(self.assemble(row).await?);
        }
        Ok(vendors)
    }

    /// Apply a partial profile update and return the refreshed record.
    pub async fn update_profile(
        &self,
        id: &str,
        changes: &ProfileChanges,
    ) -> Result<Option<Vendor>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE vendor SET
                name = COALESCE(?, name),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                website = COALESCE(?, website)
             WHERE id = ?",
        )
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.website)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.vendor_by_id(id).await
    }

    /// Remove a vendor and everything attached to it: roles, login codes,
    /// chaos, and both directions of any connections.
    pub async fn delete_vendor(&self, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM vendor WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM role WHERE vendor_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM auth_code WHERE vendor_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chaos WHERE vendor_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM connection WHERE vendor1 = ? OR vendor2 = ?")
            .bind(id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn assign_role(&self, id: &str, role: Role, add: bool) -> Result<(), sqlx::Error> {
        if add {
            sqlx::query("INSERT OR IGNORE INTO role (vendor_id, role) VALUES (?, ?)")
                .bind(id)
                .bind(role.as_str())
                .execute(&self.pool)
                .await?;
        } else {
            sqlx::query("DELETE FROM role WHERE vendor_id = ? AND role = ?")
                .bind(id)
                .bind(role.as_str())
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    // -- login codes --------------------------------------------------------

    pub async fn add_auth_code(&self, id: &str, code: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO auth_code (vendor_id, code) VALUES (?, ?)
             ON CONFLICT(vendor_id) DO UPDATE SET code = excluded.code",
        )
        .bind(id)
        .bind(code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn validate_auth_code(&self, id: &str, code: &str) -> Result<bool, sqlx::Error> {
        let stored: Option<(String,)> =
            sqlx::query_as("SELECT code FROM auth_code WHERE vendor_id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(stored.is_some_and(|(stored,)| stored == code))
    }

    // -- chaos --------------------------------------------------------------

    /// Create or overwrite the vendor's chaos record.
    pub async fn set_chaos(&self, vendor_id: &str, chaos: &Chaos) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO chaos (vendor_id, kind, fix_code, initiated, fixed)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(vendor_id) DO UPDATE SET
                kind = excluded.kind,
                fix_code = excluded.fix_code,
                initiated = excluded.initiated,
                fixed = excluded.fixed",
        )
        .bind(vendor_id)
        .bind(chaos.kind.as_str())
        .bind(chaos.fix_code.as_ref().map(FixCode::as_str))
        .bind(chaos.initiated_date)
        .bind(chaos.fix_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Administrative removal of the chaos record.
    pub async fn clear_chaos(&self, vendor_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM chaos WHERE vendor_id = ?")
            .bind(vendor_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Challenge-response resolution, in one transaction.
    ///
    /// The fix code is the actual secret here; the credential only routes to
    /// the record. A matching code clears the fault and consumes the code; a
    /// mismatch leaves state exactly as it was.
    pub async fn resolve_chaos(
        &self,
        api_key: &ApiKey,
        fix_code: &str,
    ) -> Result<ResolveOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let vendor: Option<(String,)> =
            sqlx::query_as("SELECT id FROM vendor WHERE api_key = ?")
                .bind(api_key.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let Some((vendor_id,)) = vendor else {
            return Ok(ResolveOutcome::UnknownVendor);
        };

        let chaos: Option<(String, Option<String>)> =
            sqlx::query_as("SELECT kind, fix_code FROM chaos WHERE vendor_id = ?")
                .bind(&vendor_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((kind, stored_code)) = chaos else {
            return Ok(ResolveOutcome::NoChaos);
        };
        if kind == ChaosKind::None.as_str() {
            return Ok(ResolveOutcome::NoChaos);
        }
        if stored_code.as_deref() != Some(fix_code) {
            return Ok(ResolveOutcome::Unresolved);
        }

        sqlx::query(
            "UPDATE chaos SET kind = ?, fix_code = NULL, fixed = ? WHERE vendor_id = ?",
        )
        .bind(ChaosKind::None.as_str())
        .bind(Utc::now())
        .bind(&vendor_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(vendor = %vendor_id, "chaos resolved");
        Ok(ResolveOutcome::Resolved)
    }

    // -- connections --------------------------------------------------------

    /// Request a pairing for `purpose`, matching with another waiting vendor
    /// if one exists.
    ///
    /// The insert-search-link sequence runs in a single transaction; the
    /// first statement is a write, so concurrent attempts for the same
    /// purpose serialize on the database write lock and cannot both observe
    /// "no partner waiting".
    pub async fn request_connection(
        &self,
        vendor_id: &str,
        purpose: &str,
    ) -> Result<ConnectionView, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO connection (vendor1, vendor2, purpose, created)
             VALUES (?, NULL, ?, ?)
             ON CONFLICT(vendor1, purpose) DO NOTHING",
        )
        .bind(vendor_id)
        .bind(purpose)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let (partner,): (Option<String>,) =
            sqlx::query_as("SELECT vendor2 FROM connection WHERE vendor1 = ? AND purpose = ?")
                .bind(vendor_id)
                .bind(purpose)
                .fetch_one(&mut *tx)
                .await?;

        if partner.is_none() {
            let open: Option<(String,)> = sqlx::query_as(
                "SELECT vendor1 FROM connection
                 WHERE vendor1 != ? AND vendor2 IS NULL AND purpose = ?
                 ORDER BY created LIMIT 1",
            )
            .bind(vendor_id)
            .bind(purpose)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some((partner_id,)) = open {
                sqlx::query(
                    "UPDATE connection SET vendor2 = ? WHERE vendor1 = ? AND purpose = ?",
                )
                .bind(&partner_id)
                .bind(vendor_id)
                .bind(purpose)
                .execute(&mut *tx)
                .await?;
                sqlx::query(
                    "UPDATE connection SET vendor2 = ? WHERE vendor1 = ? AND purpose = ?",
                )
                .bind(vendor_id)
                .bind(&partner_id)
                .bind(purpose)
                .execute(&mut *tx)
                .await?;
                tracing::info!(vendor = %vendor_id, partner = %partner_id, purpose, "vendors paired");
            }
        }
        tx.commit().await?;

        let view = self.connection_view(vendor_id, purpose).await?;
        Ok(view.unwrap_or_else(|| ConnectionView::waiting(purpose)))
    }

    /// Attach a rating to a fulfilled pairing. Returns the refreshed view,
    /// or `None` when no fulfilled pairing with that partner exists.
    pub async fn rate_connection(
        &self,
        vendor_id: &str,
        partner_id: &str,
        purpose: &str,
        rating: u8,
    ) -> Result<Option<ConnectionView>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE connection SET rating = ?
             WHERE vendor1 = ? AND purpose = ? AND vendor2 = ?",
        )
        .bind(i64::from(rating))
        .bind(vendor_id)
        .bind(purpose)
        .bind(partner_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.connection_view(vendor_id, purpose).await
    }

    /// The caller's view of one pairing, with partner contact fields joined
    /// in once fulfilled.
    pub async fn connection_view(
        &self,
        vendor_id: &str,
        purpose: &str,
    ) -> Result<Option<ConnectionView>, sqlx::Error> {
        let row = sqlx::query_as::<_, ConnectionRow>(
            "SELECT vendor2, purpose, rating FROM connection WHERE vendor1 = ? AND purpose = ?",
        )
        .bind(vendor_id)
        .bind(purpose)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.view_from_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn view_from_row(&self, row: ConnectionRow) -> Result<ConnectionView, sqlx::Error> {
        let mut view = ConnectionView::waiting(&row.purpose);
        view.rating = row.rating.map(|r| r as u8);
        if let Some(partner_id) = row.vendor2 {
            let partner: Option<(Option<String>, Option<String>, Option<String>, Option<String>)> =
                sqlx::query_as("SELECT name, email, phone, website FROM vendor WHERE id = ?")
                    .bind(&partner_id)
                    .fetch_optional(&self.pool)
                    .await?;
            if let Some((name, email, phone, website)) = partner {
                view.name = name;
                view.email = email;
                view.phone = phone;
                view.website = website;
            }
            view.id = Some(partner_id);
        }
        Ok(view)
    }

    // -- assembly -----------------------------------------------------------

    async fn assemble(&self, row: VendorRow) -> Result<Vendor, sqlx::Error> {
        let role_rows: Vec<(String,)> =
            sqlx::query_as("SELECT role FROM role WHERE vendor_id = ?")
                .bind(&row.id)
                .fetch_all(&self.pool)
                .await?;
        let mut roles: Vec<Role> = role_rows
            .into_iter()
            .filter_map(|(role,)| role.parse().ok())
            .collect();
        if !roles.contains(&Role::Vendor) {
            roles.push(Role::Vendor);
        }

        let chaos_row = sqlx::query_as::<_, ChaosRow>(
            "SELECT kind, fix_code, initiated, fixed FROM chaos WHERE vendor_id = ?",
        )
        .bind(&row.id)
        .fetch_optional(&self.pool)
        .await?;
        let chaos = match chaos_row {
            Some(chaos_row) => Some(Chaos {
                kind: ChaosKind::from_str(&chaos_row.kind)
                    .map_err(|err| sqlx::Error::Decode(Box::new(err)))?,
                fix_code: chaos_row.fix_code.map(FixCode::from),
                initiated_date: chaos_row.initiated,
                fix_date: chaos_row.fixed,
            }),
            None => None,
        };

        let connection_rows = sqlx::query_as::<_, ConnectionRow>(
            "SELECT vendor2, purpose, rating FROM connection WHERE vendor1 = ?",
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;
        let mut connections = HashMap::with_capacity(connection_rows.len());
        for connection_row in connection_rows {
            let view = self.view_from_row(connection_row).await?;
            connections.insert(view.purpose.clone(), view);
        }

        Ok(Vendor {
            id: row.id,
            api_key: ApiKey::from(row.api_key),
            name: row.name,
            email: row.email,
            phone: row.phone,
            website: row.website,
            created: row.created,
            roles,
            chaos,
            connections,
        })
    }
}
