//! CSV billing report
//!
//! One line per trip in a fixed column order. Rows that failed to price
//! keep their trip columns, put `ERROR` in the billing model column and the
//! message in the base cost column, and leave the other amounts empty.

use chrono::{DateTime, SecondsFormat, Utc};
use fleetbill_common::{BillingRow, RowStatus, TenantId};
use rust_decimal::Decimal;

/// Report columns, in order
pub const REPORT_COLUMNS: [&str; 9] = [
    "trip_id",
    "start_time",
    "end_time",
    "distance_km",
    "billing_model",
    "base_cost",
    "tax_amount",
    "total_cost",
    "employee_incentive",
];

/// Download name for a tenant's report generated at `now`
pub fn report_filename(tenant: &TenantId, now: DateTime<Utc>) -> String {
    format!(
        "billing_report_{}_{}.csv",
        tenant,
        now.format("%Y%m%d_%H%M%S")
    )
}

/// Render rows as CSV bytes, header first
pub fn write_csv(rows: &[BillingRow]) -> Vec<u8> {
    let mut out = String::new();
    push_record(&mut out, REPORT_COLUMNS.iter().map(|c| c.to_string()));
    for row in rows {
        push_record(&mut out, row_fields(row).into_iter());
    }
    out.into_bytes()
}

fn row_fields(row: &BillingRow) -> [String; 9] {
    let time = |at: Option<DateTime<Utc>>| {
        at.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default()
    };
    let amount = |value: Option<Decimal>| value.map(|v| v.to_string()).unwrap_or_default();

    let (model, base) = match row.status {
        RowStatus::Success => (
            row.billing_model
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            amount(row.base_cost),
        ),
        RowStatus::Error => (
            RowStatus::Error.as_str().to_string(),
            row.error.clone().unwrap_or_default(),
        ),
    };

    [
        row.trip_id.clone(),
        time(row.start_time),
        time(row.end_time),
        row.distance_km.map(|km| km.to_string()).unwrap_or_default(),
        model,
        base,
        amount(row.tax_amount),
        amount(row.total_cost),
        amount(row.employee_incentive),
    ]
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, &field);
    }
    out.push_str("\r\n");
}

/// Quote fields containing separators, quotes, or line breaks
fn push_field(out: &mut String, field: &str) {
    if field.contains(&[',', '"', '\r', '\n'][..]) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}
