//! Shared domain enums for the visit list

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// ColumnKey
// ---------------------------------------------------------------------------

/// Known columns of the visit list, in their default display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKey {
    Id,
    StoreId,
    StoreName,
    EmployeeId,
    EmployeeName,
    VisitDate,
    ScheduledStartTime,
    ScheduledEndTime,
    VisitStart,
    VisitEnd,
    Purpose,
    /// Derived visit status
    Outcome,
    StorePrimaryContact,
    District,
    SubDistrict,
}

impl ColumnKey {
    pub const ALL: [ColumnKey; 15] = [
        ColumnKey::Id,
        ColumnKey::StoreId,
        ColumnKey::StoreName,
        ColumnKey::EmployeeId,
        ColumnKey::EmployeeName,
        ColumnKey::VisitDate,
        ColumnKey::ScheduledStartTime,
        ColumnKey::ScheduledEndTime,
        ColumnKey::VisitStart,
        ColumnKey::VisitEnd,
        ColumnKey::Purpose,
        ColumnKey::Outcome,
        ColumnKey::StorePrimaryContact,
        ColumnKey::District,
        ColumnKey::SubDistrict,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKey::Id => "id",
            ColumnKey::StoreId => "storeId",
            ColumnKey::StoreName => "storeName",
            ColumnKey::EmployeeId => "employeeId",
            ColumnKey::EmployeeName => "employeeName",
            ColumnKey::VisitDate => "visitDate",
            ColumnKey::ScheduledStartTime => "scheduledStartTime",
            ColumnKey::ScheduledEndTime => "scheduledEndTime",
            ColumnKey::VisitStart => "visitStart",
            ColumnKey::VisitEnd => "visitEnd",
            ColumnKey::Purpose => "purpose",
            ColumnKey::Outcome => "outcome",
            ColumnKey::StorePrimaryContact => "storePrimaryContact",
            ColumnKey::District => "district",
            ColumnKey::SubDistrict => "subDistrict",
        }
    }

    /// The derived status column is shown on screen but never exported
    pub fn is_exportable(&self) -> bool {
        !matches!(self, ColumnKey::Outcome)
    }

    /// Sort field backing this column, if the record API can sort on it
    pub fn sort_column(&self) -> Option<SortColumn> {
        match self {
            ColumnKey::Id => Some(SortColumn::Id),
            ColumnKey::StoreName => Some(SortColumn::StoreName),
            ColumnKey::EmployeeName => Some(SortColumn::EmployeeName),
            ColumnKey::VisitDate => Some(SortColumn::VisitDate),
            ColumnKey::Purpose => Some(SortColumn::Purpose),
            _ => None,
        }
    }

    /// Column set shown to a user who never customized the list
    pub fn defaults() -> Vec<ColumnKey> {
        vec![
            ColumnKey::StoreName,
            ColumnKey::EmployeeName,
            ColumnKey::VisitDate,
            ColumnKey::VisitStart,
            ColumnKey::VisitEnd,
            ColumnKey::Purpose,
            ColumnKey::Outcome,
        ]
    }
}

impl std::fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ColumnKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnKey::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown column: {}", s))
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Fields the record API accepts in its `sort` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    Id,
    VisitDate,
    StoreName,
    EmployeeName,
    Purpose,
}

impl SortColumn {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortColumn::Id => "id",
            SortColumn::VisitDate => "visit_date",
            SortColumn::StoreName => "storeName",
            SortColumn::EmployeeName => "employeeName",
            SortColumn::Purpose => "purpose",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

// ---------------------------------------------------------------------------
// VisitStatus
// ---------------------------------------------------------------------------

/// Status derived from a visit's check-in/check-out stamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum VisitStatus {
    Completed,
    #[serde(rename = "Checked Out")]
    CheckedOut,
    #[serde(rename = "On Going")]
    OnGoing,
    Assigned,
}

impl std::fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            VisitStatus::Completed => "Completed",
            VisitStatus::CheckedOut => "Checked Out",
            VisitStatus::OnGoing => "On Going",
            VisitStatus::Assigned => "Assigned",
        };
        write!(f, "{}", label)
    }
}
