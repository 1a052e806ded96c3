//! SQLite storage backend

use super::{expect_row, BillingStore, Connector};
use chrono::{DateTime, SecondsFormat, Utc};
use fleetbill_common::{
    parse_decimal, parse_timestamp, BillingError, ContractRecord, ContractSummary,
    ContractVersion, ListedTrip, NewTrip, Result, TenantId, TripRecord, UnreadableTrip, VendorId,
    DEFAULT_VEHICLE_TYPE,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contracts (
    id          TEXT PRIMARY KEY,
    client_id   TEXT NOT NULL,
    vendor_id   TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'ACTIVE'
);

CREATE INDEX IF NOT EXISTS idx_contracts_client_vendor
    ON contracts (client_id, vendor_id);

CREATE TABLE IF NOT EXISTS contract_versions (
    id              TEXT PRIMARY KEY,
    contract_id     TEXT NOT NULL REFERENCES contracts (id),
    valid_from      TEXT NOT NULL,
    valid_until     TEXT,
    billing_model   TEXT NOT NULL,
    rules_config    TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_contract_versions_contract
    ON contract_versions (contract_id, valid_from);

CREATE TABLE IF NOT EXISTS trips (
    id              TEXT PRIMARY KEY,
    client_id       TEXT NOT NULL,
    vendor_id       TEXT NOT NULL,
    distance_km     TEXT NOT NULL,
    start_time      TEXT,
    end_time        TEXT,
    is_carpool      INTEGER NOT NULL DEFAULT 0,
    vehicle_type    TEXT
);

CREATE INDEX IF NOT EXISTS idx_trips_client_start
    ON trips (client_id, start_time);
"#;

const TRIP_COLUMNS: &str =
    "id, client_id, vendor_id, distance_km, start_time, end_time, is_carpool, vehicle_type";

/// Timestamps are stored in one fixed-width UTC form so text order is time order
fn to_sql_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn from_sql_time(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_timestamp).transpose()
}

fn parse_rules(raw: &str) -> Result<Value> {
    Ok(serde_json::from_str(raw)?)
}

/// Decode failures of stored rows are storage errors
fn corrupt(what: &str, err: BillingError) -> BillingError {
    let detail = match err {
        BillingError::Validation(msg) | BillingError::Serialization(msg) => msg,
        other => other.to_string(),
    };
    BillingError::Storage(format!("{} is unreadable: {}", what, detail))
}

/// Raw trip row before type conversion
struct TripRow {
    id: String,
    client_id: String,
    vendor_id: String,
    distance_km: String,
    start_time: Option<String>,
    end_time: Option<String>,
    is_carpool: bool,
    vehicle_type: Option<String>,
}

impl TripRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            client_id: row.get(1)?,
            vendor_id: row.get(2)?,
            distance_km: row.get(3)?,
            start_time: row.get(4)?,
            end_time: row.get(5)?,
            is_carpool: row.get(6)?,
            vehicle_type: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<TripRecord> {
        self.decode()
            .map_err(|err| corrupt(&format!("Stored trip {}", self.id), err))
    }

    /// Decode for a listing, keeping undecodable rows
    fn into_listed(self) -> ListedTrip {
        self.decode().map_err(|err| UnreadableTrip {
            reason: corrupt(&format!("Stored trip {}", self.id), err).to_string(),
            start_time: from_sql_time(self.start_time.clone()).ok().flatten(),
            end_time: from_sql_time(self.end_time.clone()).ok().flatten(),
            distance_km: parse_decimal(&self.distance_km).ok(),
            trip_id: self.id,
        })
    }

    fn decode(&self) -> Result<TripRecord> {
        Ok(TripRecord {
            trip_id: self.id.clone(),
            tenant_id: TenantId::parse(&self.client_id)?,
            vendor_id: VendorId::parse(&self.vendor_id)?,
            distance_km: parse_decimal(&self.distance_km)?.max(Decimal::ZERO),
            start_time: from_sql_time(self.start_time.clone())?,
            end_time: from_sql_time(self.end_time.clone())?,
            is_carpool: self.is_carpool,
            vehicle_type: self
                .vehicle_type
                .clone()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_VEHICLE_TYPE.to_string()),
        })
    }
}

/// Raw contract version row
struct VersionRow {
    id: String,
    contract_id: String,
    valid_from: String,
    valid_until: Option<String>,
    billing_model: String,
    rules_config: String,
}

impl VersionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            contract_id: row.get(1)?,
            valid_from: row.get(2)?,
            valid_until: row.get(3)?,
            billing_model: row.get(4)?,
            rules_config: row.get(5)?,
        })
    }

    fn into_version(self) -> Result<ContractVersion> {
        let what = format!("Contract version {}", self.id);
        self.decode().map_err(|err| corrupt(&what, err))
    }

    fn decode(self) -> Result<ContractVersion> {
        Ok(ContractVersion {
            valid_from: parse_timestamp(&self.valid_from)?,
            valid_until: from_sql_time(self.valid_until)?,
            rules_config: parse_rules(&self.rules_config)?,
            version_id: self.id,
            contract_id: self.contract_id,
            billing_model: self.billing_model,
        })
    }
}

/// Billing store over a single SQLite connection
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Private in-memory database with the schema applied
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    /// Create missing tables and indexes
    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Register a contract between a tenant and a vendor
    pub fn insert_contract(
        &self,
        contract_id: &str,
        tenant: &TenantId,
        vendor: &VendorId,
        status: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO contracts (id, client_id, vendor_id, status) VALUES (?1, ?2, ?3, ?4)",
            params![contract_id, tenant.to_string(), vendor.to_string(), status],
        )?;
        Ok(())
    }

    /// Add a version to an existing contract
    pub fn insert_contract_version(&self, version: &ContractVersion) -> Result<()> {
        if let Some(until) = version.valid_until {
            if until < version.valid_from {
                return Err(BillingError::Validation(
                    "valid_until cannot be before valid_from".into(),
                ));
            }
        }
        self.conn.execute(
            "INSERT INTO contract_versions \
             (id, contract_id, valid_from, valid_until, billing_model, rules_config) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                version.version_id,
                version.contract_id,
                to_sql_time(version.valid_from),
                version.valid_until.map(to_sql_time),
                version.billing_model,
                serde_json::to_string(&version.rules_config)?,
            ],
        )?;
        Ok(())
    }

    /// Set `incentive_rules.<name>` on a version, keeping every other key
    ///
    /// Returns the updated rule configuration.
    #[instrument(skip(self))]
    pub fn set_incentive_rule(
        &mut self,
        version_id: &str,
        name: &str,
        amount: Decimal,
    ) -> Result<Value> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT rules_config FROM contract_versions WHERE id = ?1",
                params![version_id],
                |row| row.get(0),
            )
            .optional()?;
        let raw = raw.ok_or_else(|| {
            BillingError::Validation(format!("Contract version {} does not exist", version_id))
        })?;

        let mut rules = match parse_rules(&raw)? {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        let incentives = rules
            .entry("incentive_rules")
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if !incentives.is_object() {
            *incentives = Value::Object(serde_json::Map::new());
        }
        let value = serde_json::Number::from_str(&amount.normalize().to_string())
            .map(Value::Number)
            .unwrap_or_else(|_| Value::String(amount.to_string()));
        if let Value::Object(map) = incentives {
            map.insert(name.to_string(), value);
        }

        let rules = Value::Object(rules);
        self.conn.execute(
            "UPDATE contract_versions SET rules_config = ?1 WHERE id = ?2",
            params![serde_json::to_string(&rules)?, version_id],
        )?;
        debug!(version_id, name, "Incentive rule updated");
        Ok(rules)
    }

    fn versions_of(&self, contract_id: &str) -> Result<Vec<ContractVersion>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, contract_id, valid_from, valid_until, billing_model, rules_config \
             FROM contract_versions WHERE contract_id = ?1 ORDER BY valid_from, id",
        )?;
        let rows = stmt
            .query_map(params![contract_id], VersionRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(VersionRow::into_version).collect()
    }
}

impl BillingStore for SqliteStore {
    fn find_trip(&self, tenant: &TenantId, trip_id: &str) -> Result<Option<TripRecord>> {
        let sql = format!(
            "SELECT {} FROM trips WHERE id = ?1 AND client_id = ?2",
            TRIP_COLUMNS
        );
        let row = self
            .conn
            .query_row(&sql, params![trip_id, tenant.to_string()], TripRow::from_row)
            .optional()?;
        row.map(TripRow::into_record).transpose()
    }

    fn find_contract(
        &self,
        tenant: &TenantId,
        vendor: &VendorId,
    ) -> Result<Option<ContractRecord>> {
        let head: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT id, status FROM contracts \
                 WHERE client_id = ?1 AND vendor_id = ?2 ORDER BY id LIMIT 1",
                params![tenant.to_string(), vendor.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((contract_id, status)) = head else {
            return Ok(None);
        };
        let versions = self.versions_of(&contract_id)?;
        Ok(Some(ContractRecord {
            contract_id,
            tenant_id: *tenant,
            vendor_id: *vendor,
            status,
            versions,
        }))
    }

    fn find_current_contract(
        &self,
        tenant: &TenantId,
        at: DateTime<Utc>,
    ) -> Result<Option<ContractSummary>> {
        let row = self
            .conn
            .query_row(
                "SELECT c.id, c.vendor_id, cv.billing_model, cv.rules_config, \
                        cv.valid_from, cv.valid_until \
                 FROM contracts c \
                 JOIN contract_versions cv ON c.id = cv.contract_id \
                 WHERE c.client_id = ?1 \
                   AND cv.valid_from <= ?2 \
                   AND (cv.valid_until IS NULL OR cv.valid_until >= ?2) \
                 ORDER BY cv.valid_from DESC, cv.id DESC \
                 LIMIT 1",
                params![tenant.to_string(), to_sql_time(at)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((contract_id, vendor_id, model, rules, valid_from, valid_until)) = row else {
            return Ok(None);
        };
        let what = format!("Contract {}", contract_id);
        let decoded = (|| -> Result<ContractSummary> {
            Ok(ContractSummary {
                vendor_id: VendorId::parse(&vendor_id)?,
                billing_model: model.trim().to_uppercase(),
                rules_config: parse_rules(&rules)?,
                valid_from: parse_timestamp(&valid_from)?,
                valid_until: from_sql_time(valid_until)?,
                contract_id,
            })
        })();
        decoded.map(Some).map_err(|err| corrupt(&what, err))
    }

    fn insert_trip(&mut self, trip: &NewTrip) -> Result<TripRecord> {
        self.conn.execute(
            "INSERT INTO trips \
             (id, client_id, vendor_id, distance_km, start_time, end_time, is_carpool, vehicle_type) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                trip.trip_id,
                trip.tenant_id.to_string(),
                trip.vendor_id.to_string(),
                trip.distance_km.to_string(),
                to_sql_time(trip.start_time),
                trip.end_time.map(to_sql_time),
                trip.is_carpool,
                trip.vehicle_type,
            ],
        )?;
        expect_row(self.find_trip(&trip.tenant_id, &trip.trip_id)?, "Inserted trip")
    }

    fn list_trips(&self, tenant: &TenantId) -> Result<Vec<ListedTrip>> {
        let sql = format!(
            "SELECT {} FROM trips WHERE client_id = ?1 ORDER BY start_time DESC, id",
            TRIP_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![tenant.to_string()], TripRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().map(TripRow::into_listed).collect())
    }

    fn begin(&mut self) -> Result<()> {
        if self.is_in_transaction() {
            return Err(BillingError::Storage("Transaction already open".into()));
        }
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.is_in_transaction() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.is_in_transaction() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn is_in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

/// Opens a fresh [`SqliteStore`] per call
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }
}

impl Connector for SqliteConnector {
    type Conn = SqliteStore;

    fn connect(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.path, self.busy_timeout)
    }
}
