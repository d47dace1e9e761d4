//! Field schema of each record kind.
//!
//! Record bodies are stored as JSON objects. Before anything is written the
//! body is checked against the field table of its kind: unknown fields are
//! rejected, defaults are filled in, money is normalized to two decimal
//! places and timestamps to RFC 3339. Reference existence is checked by the
//! storage backend, which is the only place that can see other records.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use super::kind::ResourceKind;
use crate::error::ValidationError;
use crate::identity::normalize_email;

/// Fields that clients may send but that are always owned by storage.
pub const READ_ONLY_FIELDS: &[&str] = &["id", "tenant", "created_at", "updated_at"];

/// What a reference field points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget {
    /// A user of the same tenant.
    User,
    /// A record of the same tenant.
    Record(ResourceKind),
}

/// What happens to a referencing record when its target is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// The referencing record is deleted too.
    Cascade,
    /// The reference is cleared.
    SetNull,
}

/// Value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Single-line string with a maximum length in characters.
    Text(usize),
    /// Unbounded string.
    LongText,
    /// Email address, stored lowercase.
    Email,
    /// Signed 64-bit integer.
    Integer,
    /// Fixed-point amount stored as a string.
    Decimal { digits: u32, places: u32 },
    /// Timestamp, accepted as RFC 3339 or `YYYY-MM-DD`.
    DateTime,
    /// Boolean.
    Bool,
    /// Arbitrary JSON.
    Json,
    /// One of a fixed set of strings.
    Choice(&'static [&'static str]),
    /// Integer id of another row of the same tenant.
    Reference { target: RefTarget, on_delete: OnDelete },
}

/// Default applied when a field is absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Int(i64),
    Str(&'static str),
    Bool(bool),
    /// The current time.
    Now,
}

impl DefaultValue {
    fn to_value(self) -> Value {
        match self {
            DefaultValue::Int(i) => Value::from(i),
            DefaultValue::Str(s) => Value::from(s),
            DefaultValue::Bool(b) => Value::Bool(b),
            DefaultValue::Now => Value::from(format_timestamp(Utc::now())),
        }
    }
}

/// One field of a record kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub default: Option<DefaultValue>,
    /// Accepted on input, never returned.
    pub write_only: bool,
    /// Unique per tenant.
    pub unique: bool,
}

impl FieldSpec {
    const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: None,
            write_only: false,
            unique: false,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    const fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

const MONEY: FieldType = FieldType::Decimal {
    digits: 12,
    places: 2,
};

const fn text(name: &'static str, max: usize) -> FieldSpec {
    FieldSpec::new(name, FieldType::Text(max))
}

const fn reference(name: &'static str, target: RefTarget, on_delete: OnDelete) -> FieldSpec {
    FieldSpec::new(name, FieldType::Reference { target, on_delete })
}

const fn record_ref(name: &'static str, kind: ResourceKind, on_delete: OnDelete) -> FieldSpec {
    reference(name, RefTarget::Record(kind), on_delete)
}

/// Lead pipeline states.
pub const LEAD_STATUSES: &[&str] = &["new", "contacted", "qualified", "lost"];

/// Campaign states.
pub const CAMPAIGN_STATUSES: &[&str] = &["active", "paused", "completed", "draft"];

/// Supported integration types.
pub const INTEGRATION_TYPES: &[&str] = &["whatsapp", "meta_ads", "salesforce", "stripe", "sendgrid"];

static LEAD_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("email", FieldType::Email),
    text("phone", 50),
    text("first_name", 100),
    text("last_name", 100),
    text("source", 100),
    FieldSpec::new("status", FieldType::Choice(LEAD_STATUSES)).default(DefaultValue::Str("new")),
    FieldSpec::new("score", FieldType::Integer).default(DefaultValue::Int(0)),
    reference("assigned_to", RefTarget::User, OnDelete::SetNull),
    text("travel_dates", 255),
    text("destination", 255),
    FieldSpec::new("budget", MONEY),
    FieldSpec::new("adults", FieldType::Integer).default(DefaultValue::Int(1)),
    FieldSpec::new("children", FieldType::Integer).default(DefaultValue::Int(0)),
    FieldSpec::new("notes", FieldType::LongText),
];

static CUSTOMER_FIELDS: &[FieldSpec] = &[
    record_ref("lead", ResourceKind::Lead, OnDelete::SetNull),
    text("customer_type", 100),
    text("loyalty_level", 100),
    FieldSpec::new("total_spent", MONEY).default(DefaultValue::Str("0")),
    FieldSpec::new("last_booking_date", FieldType::DateTime),
];

static DEAL_FIELDS: &[FieldSpec] = &[
    record_ref("customer", ResourceKind::Customer, OnDelete::Cascade).required(),
    text("title", 255).required(),
    FieldSpec::new("value", MONEY).required(),
    text("stage", 100).required(),
    FieldSpec::new("probability", FieldType::Integer),
    FieldSpec::new("expected_close_date", FieldType::DateTime),
    reference("assigned_to", RefTarget::User, OnDelete::SetNull),
];

static COMMUNICATION_FIELDS: &[FieldSpec] = &[
    record_ref("customer", ResourceKind::Customer, OnDelete::SetNull),
    text("type", 50).required(),
    text("subject", 255),
    FieldSpec::new("content", FieldType::LongText),
    FieldSpec::new("sent_at", FieldType::DateTime).default(DefaultValue::Now),
    text("status", 50).required(),
];

static PACKAGE_FIELDS: &[FieldSpec] = &[
    text("name", 255).required(),
    FieldSpec::new("description", FieldType::LongText),
    FieldSpec::new("base_price", MONEY).required(),
    FieldSpec::new("duration", FieldType::Integer).required(),
    text("destination", 255).required(),
];

static BOOKING_FIELDS: &[FieldSpec] = &[
    record_ref("customer", ResourceKind::Customer, OnDelete::Cascade).required(),
    record_ref("package", ResourceKind::Package, OnDelete::Cascade).required(),
    text("status", 100).required(),
    FieldSpec::new("total_amount", MONEY).required(),
    FieldSpec::new("travel_date", FieldType::DateTime).required(),
    FieldSpec::new("pax_count", FieldType::Integer).required(),
];

static INTEGRATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("integration_type", FieldType::Choice(INTEGRATION_TYPES))
        .required()
        .unique(),
    FieldSpec::new("is_active", FieldType::Bool).default(DefaultValue::Bool(false)),
    FieldSpec::new("credentials", FieldType::Json)
        .required()
        .write_only(),
    FieldSpec::new("settings", FieldType::Json),
    FieldSpec::new("last_synced_at", FieldType::DateTime),
];

static CAMPAIGN_FIELDS: &[FieldSpec] = &[
    record_ref("package", ResourceKind::Package, OnDelete::SetNull),
    text("campaign_id", 255).required(),
    text("campaign_name", 255).required(),
    FieldSpec::new("status", FieldType::Choice(CAMPAIGN_STATUSES))
        .default(DefaultValue::Str("draft")),
    FieldSpec::new("budget", MONEY).required(),
    FieldSpec::new("spend", MONEY).default(DefaultValue::Str("0")),
    FieldSpec::new("impressions", FieldType::Integer).default(DefaultValue::Int(0)),
    FieldSpec::new("clicks", FieldType::Integer).default(DefaultValue::Int(0)),
    FieldSpec::new("conversions", FieldType::Integer).default(DefaultValue::Int(0)),
    FieldSpec::new("revenue", MONEY).default(DefaultValue::Str("0")),
    FieldSpec::new(
        "roi",
        FieldType::Decimal {
            digits: 10,
            places: 2,
        },
    )
    .default(DefaultValue::Str("0")),
    FieldSpec::new("start_date", FieldType::DateTime).required(),
    FieldSpec::new("end_date", FieldType::DateTime),
];

static CONVERSATION_FIELDS: &[FieldSpec] = &[
    record_ref("lead", ResourceKind::Lead, OnDelete::SetNull),
    record_ref("customer", ResourceKind::Customer, OnDelete::SetNull),
    text("conversation_id", 255).required(),
    text("phone_number", 50).required(),
    FieldSpec::new("last_message_at", FieldType::DateTime).required(),
    FieldSpec::new("message_count", FieldType::Integer).default(DefaultValue::Int(0)),
    FieldSpec::new(
        "sentiment_score",
        FieldType::Decimal {
            digits: 3,
            places: 2,
        },
    ),
    text("sentiment_label", 20),
    text("intent", 100),
    FieldSpec::new("is_active", FieldType::Bool).default(DefaultValue::Bool(true)),
];

impl ResourceKind {
    /// The field table of this kind.
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            ResourceKind::Lead => LEAD_FIELDS,
            ResourceKind::Customer => CUSTOMER_FIELDS,
            ResourceKind::Deal => DEAL_FIELDS,
            ResourceKind::Communication => COMMUNICATION_FIELDS,
            ResourceKind::Package => PACKAGE_FIELDS,
            ResourceKind::Booking => BOOKING_FIELDS,
            ResourceKind::Integration => INTEGRATION_FIELDS,
            ResourceKind::Campaign => CAMPAIGN_FIELDS,
            ResourceKind::Conversation => CONVERSATION_FIELDS,
        }
    }

    /// Looks up a single field.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Reference fields of this kind as `(field, target, on_delete)`.
    pub fn references(self) -> impl Iterator<Item = (&'static str, RefTarget, OnDelete)> {
        self.fields().iter().filter_map(|f| match f.ty {
            FieldType::Reference { target, on_delete } => Some((f.name, target, on_delete)),
            _ => None,
        })
    }

    /// Fields that must be unique within a tenant.
    pub fn unique_fields(self) -> impl Iterator<Item = &'static str> {
        self.fields().iter().filter(|f| f.unique).map(|f| f.name)
    }

    /// Validates a full record body and returns the normalized content.
    ///
    /// Read-only fields are dropped, absent fields receive their default
    /// (or null), and every present value is checked against its type.
    pub fn prepare(&self, body: Value) -> Result<Map<String, Value>, ValidationError> {
        let Value::Object(mut input) = body else {
            return Err(ValidationError::NotAnObject);
        };
        strip_read_only(&mut input);

        if let Some(unknown) = input.keys().find(|k| self.field(k).is_none()) {
            return Err(ValidationError::invalid(unknown.as_str(), "unknown field"));
        }

        let mut out = Map::new();
        for spec in self.fields() {
            let value = match input.remove(spec.name) {
                Some(Value::Null) | None => spec.default.map(DefaultValue::to_value),
                Some(v) => Some(v),
            };
            let normalized = match value {
                Some(v) => normalize_field(spec, v)?,
                None if spec.required => {
                    return Err(ValidationError::MissingRequiredField {
                        field: spec.name.to_string(),
                    });
                }
                None => Value::Null,
            };
            out.insert(spec.name.to_string(), normalized);
        }
        Ok(out)
    }

    /// Applies a JSON merge patch to stored content and revalidates the result.
    pub fn apply_patch(
        &self,
        current: &Map<String, Value>,
        patch: Value,
    ) -> Result<Map<String, Value>, ValidationError> {
        let Value::Object(mut patch) = patch else {
            return Err(ValidationError::InvalidPatch {
                message: "merge patch must be a JSON object".to_string(),
            });
        };
        strip_read_only(&mut patch);
        let mut doc = Value::Object(current.clone());
        json_patch::merge(&mut doc, &Value::Object(patch));
        self.prepare(doc)
    }

    /// Removes write-only fields before content leaves storage.
    pub fn redact(&self, content: &mut Map<String, Value>) {
        for spec in self.fields().iter().filter(|f| f.write_only) {
            content.remove(spec.name);
        }
    }
}

/// Returns every `(kind, field, on_delete)` that references `target`.
pub fn referrers(target: RefTarget) -> Vec<(ResourceKind, &'static str, OnDelete)> {
    ResourceKind::ALL
        .into_iter()
        .flat_map(|kind| {
            kind.references()
                .filter(move |(_, t, _)| *t == target)
                .map(move |(field, _, on_delete)| (kind, field, on_delete))
        })
        .collect()
}

fn strip_read_only(map: &mut Map<String, Value>) {
    for field in READ_ONLY_FIELDS {
        map.remove(*field);
    }
}

fn normalize_field(spec: &FieldSpec, value: Value) -> Result<Value, ValidationError> {
    let name = spec.name;
    match spec.ty {
        FieldType::Text(max) => {
            let s = expect_str(name, &value)?;
            if spec.required && s.trim().is_empty() {
                return Err(ValidationError::MissingRequiredField {
                    field: name.to_string(),
                });
            }
            if s.chars().count() > max {
                return Err(ValidationError::invalid(
                    name,
                    format!("longer than {max} characters"),
                ));
            }
            Ok(value)
        }
        FieldType::LongText => expect_str(name, &value).map(|_| value.clone()),
        FieldType::Email => Ok(Value::from(normalize_email(expect_str(name, &value)?).map_err(
            |_| ValidationError::invalid(name, "not a valid address"),
        )?)),
        FieldType::Integer => match value.as_i64() {
            Some(i) => Ok(Value::from(i)),
            None => Err(ValidationError::invalid(name, "expected an integer")),
        },
        FieldType::Decimal { digits, places } => {
            normalize_decimal(name, &value, digits, places).map(Value::from)
        }
        FieldType::DateTime => {
            let ts = parse_timestamp(expect_str(name, &value)?)
                .ok_or_else(|| ValidationError::invalid(name, "expected an RFC 3339 timestamp"))?;
            Ok(Value::from(format_timestamp(ts)))
        }
        FieldType::Bool => match value {
            Value::Bool(_) => Ok(value),
            _ => Err(ValidationError::invalid(name, "expected a boolean")),
        },
        FieldType::Json => Ok(value),
        FieldType::Choice(choices) => {
            let s = expect_str(name, &value)?;
            if choices.contains(&s) {
                Ok(value)
            } else {
                Err(ValidationError::invalid(
                    name,
                    format!("'{s}' is not one of {}", choices.join(", ")),
                ))
            }
        }
        FieldType::Reference { .. } => match value.as_i64() {
            Some(id) if id > 0 => Ok(Value::from(id)),
            _ => Err(ValidationError::invalid(name, "expected a record id")),
        },
    }
}

fn expect_str<'a>(name: &str, value: &'a Value) -> Result<&'a str, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| ValidationError::invalid(name, "expected a string"))
}

/// Parses and rescales an amount to exactly `places` decimal places.
fn normalize_decimal(
    name: &str,
    value: &Value,
    digits: u32,
    places: u32,
) -> Result<String, ValidationError> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(ValidationError::invalid(name, "expected a decimal amount")),
    };
    let amount = Decimal::from_str(&raw)
        .map_err(|_| ValidationError::invalid(name, "expected a decimal amount"))?
        .normalize();
    if amount.scale() > places {
        return Err(ValidationError::invalid(
            name,
            format!("more than {places} decimal places"),
        ));
    }
    let limit = Decimal::from(10_i64.pow(digits - places));
    if amount.trunc().abs() >= limit {
        return Err(ValidationError::invalid(
            name,
            format!("more than {} digits before the decimal point", digits - places),
        ));
    }
    let mut amount = amount;
    amount.rescale(places);
    Ok(amount.to_string())
}

/// Parses an RFC 3339 timestamp or a bare calendar date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Canonical timestamp rendering used in record content.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
