//! Record kinds, field schema, stored records and pagination.

mod kind;
mod pagination;
mod record;
mod schema;

pub use kind::ResourceKind;
pub use pagination::{ListQuery, Page};
pub use record::StoredRecord;
pub use schema::{
    CAMPAIGN_STATUSES, DefaultValue, FieldSpec, FieldType, INTEGRATION_TYPES, LEAD_STATUSES,
    OnDelete, READ_ONLY_FIELDS, RefTarget, format_timestamp, parse_timestamp, referrers,
};
