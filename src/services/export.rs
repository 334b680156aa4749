//! CSV rendering of crawled visits

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;

use crate::{
    error::{AppError, AppResult},
    models::{ColumnKey, VisitRecord},
};

pub const CSV_CONTENT_TYPE: &str = "text/csv;charset=utf-8";

/// Human-readable column headers. Columns missing here are labelled with
/// their raw key.
static COLUMN_HEADERS: Lazy<HashMap<ColumnKey, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (ColumnKey::Id, "Visit ID"),
        (ColumnKey::StoreName, "Customer Name"),
        (ColumnKey::EmployeeName, "Executive"),
        (ColumnKey::VisitDate, "Date"),
        (ColumnKey::ScheduledStartTime, "Scheduled Start"),
        (ColumnKey::ScheduledEndTime, "Scheduled End"),
        (ColumnKey::VisitStart, "Visit Start"),
        (ColumnKey::VisitEnd, "Visit End"),
        (ColumnKey::Purpose, "Purpose"),
        (ColumnKey::Outcome, "Outcome"),
        (ColumnKey::StorePrimaryContact, "Primary Contact"),
        (ColumnKey::District, "District"),
        (ColumnKey::SubDistrict, "Sub District"),
    ])
});

/// Display label of a column
pub fn column_header(column: ColumnKey) -> &'static str {
    COLUMN_HEADERS
        .get(&column)
        .copied()
        .unwrap_or_else(|| column.as_str())
}

fn date_time(date: Option<NaiveDate>, time: Option<NaiveTime>) -> String {
    match (date, time) {
        (Some(date), Some(time)) => format!("{} {}", date.format("%Y-%m-%d"), time.format("%H:%M")),
        _ => String::new(),
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn cell(record: &VisitRecord, column: ColumnKey) -> String {
    match column {
        ColumnKey::Id => record.id.to_string(),
        ColumnKey::StoreId => record.store_id.map(|v| v.to_string()).unwrap_or_default(),
        ColumnKey::StoreName => text(&record.store_name),
        ColumnKey::EmployeeId => record.employee_id.map(|v| v.to_string()).unwrap_or_default(),
        ColumnKey::EmployeeName => text(&record.employee_name),
        ColumnKey::VisitDate => record
            .visit_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        ColumnKey::ScheduledStartTime => record
            .scheduled_start_time
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_default(),
        ColumnKey::ScheduledEndTime => record
            .scheduled_end_time
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_default(),
        ColumnKey::VisitStart => date_time(record.checkin_date, record.checkin_time),
        ColumnKey::VisitEnd => date_time(record.checkout_date, record.checkout_time),
        ColumnKey::Purpose => text(&record.purpose),
        ColumnKey::Outcome => record.status().to_string(),
        ColumnKey::StorePrimaryContact => text(&record.store_primary_contact),
        ColumnKey::District => text(&record.district),
        ColumnKey::SubDistrict => text(&record.sub_district),
    }
}

/// A finished export, ready to be sent as a download
#[derive(Debug, Clone)]
pub struct CsvFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CsvExporter {
    file_name: String,
}

impl CsvExporter {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Selected columns that end up in the file, in selection order
    pub fn exported_columns(selected: &[ColumnKey]) -> Vec<ColumnKey> {
        selected.iter().copied().filter(ColumnKey::is_exportable).collect()
    }

    /// Fails when nothing in `selected` can be exported
    pub fn check_columns(selected: &[ColumnKey]) -> AppResult<()> {
        if selected.iter().any(ColumnKey::is_exportable) {
            Ok(())
        } else {
            Err(AppError::Export("No exportable columns selected".to_string()))
        }
    }

    /// Header row followed by one row per record, in the given order
    pub fn render(&self, selected: &[ColumnKey], records: &[VisitRecord]) -> AppResult<CsvFile> {
        Self::check_columns(selected)?;
        let columns = Self::exported_columns(selected);
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer
            .write_record(columns.iter().map(|c| column_header(*c)))
            .map_err(|e| AppError::Export(format!("Failed to write CSV header: {}", e)))?;

        for record in records {
            writer
                .write_record(columns.iter().map(|c| cell(record, *c)))
                .map_err(|e| {
                    AppError::Export(format!("Failed to write visit {}: {}", record.id, e))
                })?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Export(format!("Failed to finish CSV file: {}", e)))?;

        tracing::debug!(
            "Rendered {} visits over {} columns ({} bytes)",
            records.len(),
            columns.len(),
            bytes.len()
        );

        Ok(CsvFile {
            file_name: self.file_name.clone(),
            content_type: CSV_CONTENT_TYPE,
            bytes,
        })
    }
}
