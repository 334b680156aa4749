//! Data models for Visitdesk

pub mod enums;
pub mod filter;
pub mod role;
pub mod visit;

// Re-export commonly used types
pub use enums::{ColumnKey, SortColumn, SortDirection, VisitStatus};
pub use filter::{FilterPatch, FilterState, NavigationContext};
pub use role::{Caller, Role};
pub use visit::{PageResult, VisitRecord, VisitRow};
