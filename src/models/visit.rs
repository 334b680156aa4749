//! Visit record model, as returned by the record API

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::enums::VisitStatus;

/// A single field visit. Records are read-only snapshots of the server state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub id: i64,
    pub store_id: Option<i64>,
    pub store_name: Option<String>,
    pub employee_id: Option<i64>,
    pub employee_name: Option<String>,
    /// Scheduled visit date
    #[serde(rename = "visit_date")]
    pub visit_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, example = "09:00:00")]
    pub scheduled_start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "10:00:00")]
    pub scheduled_end_time: Option<NaiveTime>,
    pub checkin_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, example = "09:12:00")]
    pub checkin_time: Option<NaiveTime>,
    pub checkout_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, example = "09:48:00")]
    pub checkout_time: Option<NaiveTime>,
    pub purpose: Option<String>,
    pub store_primary_contact: Option<String>,
    pub district: Option<String>,
    pub sub_district: Option<String>,
}

impl VisitRecord {
    pub fn has_checked_in(&self) -> bool {
        self.checkin_date.is_some() && self.checkin_time.is_some()
    }

    pub fn has_checked_out(&self) -> bool {
        self.checkout_date.is_some() && self.checkout_time.is_some()
    }

    /// Classify the visit. First match wins:
    /// both stamps, check-out only, check-in only, neither.
    pub fn status(&self) -> VisitStatus {
        match (self.has_checked_in(), self.has_checked_out()) {
            (true, true) => VisitStatus::Completed,
            (false, true) => VisitStatus::CheckedOut,
            (true, false) => VisitStatus::OnGoing,
            (false, false) => VisitStatus::Assigned,
        }
    }
}

/// One page of a visit search
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    #[serde(default)]
    pub content: Vec<VisitRecord>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub last: bool,
}

impl PageResult {
    /// What a disabled data source reports: nothing, and nothing more to fetch
    pub fn empty() -> Self {
        Self {
            content: Vec::new(),
            total_pages: 0,
            last: true,
        }
    }
}

/// Visit row as displayed, with its derived status
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitRow {
    #[serde(flatten)]
    pub record: VisitRecord,
    pub status: VisitStatus,
}

impl From<VisitRecord> for VisitRow {
    fn from(record: VisitRecord) -> Self {
        let status = record.status();
        Self { record, status }
    }
}
