//! Schema checks for inbound booking and review payloads.
//!
//! A schema is an ordered list of [`FieldSpec`]s. [`check`] walks the whole
//! schema and reports every failing field, so a client can fix its input in
//! one round trip. Nothing here touches storage.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use validator::{ValidateEmail, ValidateUrl};

use crate::models::{self, NewBooking, NewTimeSlot, ReviewContent};

pub const MIN_COMMENT_CHARS: usize = 10;
pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

const MAX_NAME_CHARS: usize = 200;
const MAX_SERVICE_CHARS: usize = 100;
const MAX_LONG_TEXT_CHARS: usize = 5000;
const MAX_PHONE_CHARS: usize = 20;
const MIN_PHONE_DIGITS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldReason {
    Missing,
    InvalidType,
    InvalidEmail,
    InvalidPhone,
    InvalidDatetime,
    InPast,
    OutOfRange,
    TooShort,
    TooLong,
    InvalidUrl,
    Malformed,
    UnsupportedMediaType,
}

impl FieldReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldReason::Missing => "missing",
            FieldReason::InvalidType => "invalid_type",
            FieldReason::InvalidEmail => "invalid_email",
            FieldReason::InvalidPhone => "invalid_phone",
            FieldReason::InvalidDatetime => "invalid_datetime",
            FieldReason::InPast => "in_past",
            FieldReason::OutOfRange => "out_of_range",
            FieldReason::TooShort => "too_short",
            FieldReason::TooLong => "too_long",
            FieldReason::InvalidUrl => "invalid_url",
            FieldReason::Malformed => "malformed",
            FieldReason::UnsupportedMediaType => "unsupported_media_type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: FieldReason,
}

/// Every field that failed, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub(crate) fn single(field: &'static str, reason: FieldReason) -> Self {
        Self(vec![FieldError { field, reason }])
    }

    fn push(&mut self, field: &'static str, reason: FieldReason) {
        self.0.push(FieldError { field, reason });
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn reason_for(&self, field: &str) -> Option<FieldReason> {
        self.0.iter().find(|e| e.field == field).map(|e| e.reason)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.reason.as_str()))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text { min: usize, max: usize },
    Email,
    Phone,
    /// Timestamp; `future` rejects instants earlier than now.
    DateTime { future: bool },
    Rating,
    UrlList,
    Bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, required: true, kind }
}

const fn optional(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, required: false, kind }
}

const NAME: FieldKind = FieldKind::Text { min: 1, max: MAX_NAME_CHARS };
const SERVICE: FieldKind = FieldKind::Text { min: 1, max: MAX_SERVICE_CHARS };
const LONG_TEXT: FieldKind = FieldKind::Text { min: 1, max: MAX_LONG_TEXT_CHARS };
const COMMENT: FieldKind = FieldKind::Text { min: MIN_COMMENT_CHARS, max: MAX_LONG_TEXT_CHARS };
const TOKEN: FieldKind = FieldKind::Text { min: 1, max: 128 };

pub const BOOKING_SCHEMA: &[FieldSpec] = &[
    required("customerName", NAME),
    required("customerEmail", FieldKind::Email),
    required("customerPhone", FieldKind::Phone),
    required("serviceType", SERVICE),
    optional("projectDetails", LONG_TEXT),
    required("timeSlot", FieldKind::DateTime { future: true }),
];

/// Older clients send the booking time as `date`.
const BOOKING_ALIASES: &[(&str, &str)] = &[("date", "timeSlot")];

pub const TIME_SLOT_SCHEMA: &[FieldSpec] = &[
    required("startTime", FieldKind::DateTime { future: true }),
    required("endTime", FieldKind::DateTime { future: true }),
];

pub const REVIEW_SUBMISSION_SCHEMA: &[FieldSpec] = &[
    required("token", TOKEN),
    required("rating", FieldKind::Rating),
    required("comment", COMMENT),
    optional("images", FieldKind::UrlList),
];

pub const ADMIN_REVIEW_SCHEMA: &[FieldSpec] = &[
    required("bookingId", TOKEN),
    required("rating", FieldKind::Rating),
    required("comment", COMMENT),
    required("customerName", NAME),
    required("serviceType", SERVICE),
    optional("images", FieldKind::UrlList),
];

pub const PUBLISH_SCHEMA: &[FieldSpec] = &[required("isPublished", FieldKind::Bool)];

#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Text(String),
    Instant(DateTime<Utc>),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

/// Normalized values of a payload that passed [`check`].
#[derive(Debug, Default)]
pub struct Fields(BTreeMap<&'static str, FieldValue>);

impl Fields {
    fn text(&mut self, name: &'static str) -> Option<String> {
        match self.0.remove(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    fn instant(&mut self, name: &'static str) -> Option<DateTime<Utc>> {
        match self.0.remove(name) {
            Some(FieldValue::Instant(t)) => Some(t),
            _ => None,
        }
    }

    fn int(&mut self, name: &'static str) -> Option<i64> {
        match self.0.remove(name) {
            Some(FieldValue::Int(n)) => Some(n),
            _ => None,
        }
    }

    fn boolean(&mut self, name: &'static str) -> Option<bool> {
        match self.0.remove(name) {
            Some(FieldValue::Bool(b)) => Some(b),
            _ => None,
        }
    }

    fn list(&mut self, name: &'static str) -> Vec<String> {
        match self.0.remove(name) {
            Some(FieldValue::List(items)) => items,
            _ => Vec::new(),
        }
    }
}

/// Checks `payload` against `schema`, collecting every failure.
pub fn check(payload: &Map<String, Value>, schema: &[FieldSpec]) -> Result<Fields, ValidationErrors> {
    let now = Utc::now();
    let mut errors = ValidationErrors::default();
    let mut fields = Fields::default();

    for spec in schema {
        let value = match payload.get(spec.name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(v) => Some(v),
        };

        let Some(value) = value else {
            if spec.required {
                errors.push(spec.name, FieldReason::Missing);
            }
            continue;
        };

        match check_value(value, spec.kind, now) {
            Ok(normalized) => {
                fields.0.insert(spec.name, normalized);
            }
            Err(reason) => errors.push(spec.name, reason),
        }
    }

    if errors.is_empty() {
        Ok(fields)
    } else {
        Err(errors)
    }
}

fn check_value(value: &Value, kind: FieldKind, now: DateTime<Utc>) -> Result<FieldValue, FieldReason> {
    match kind {
        FieldKind::Text { min, max } => {
            let s = value.as_str().ok_or(FieldReason::InvalidType)?.trim();
            let len = s.chars().count();
            if len < min {
                return Err(FieldReason::TooShort);
            }
            if len > max {
                return Err(FieldReason::TooLong);
            }
            Ok(FieldValue::Text(s.to_string()))
        }
        FieldKind::Email => {
            let s = value.as_str().ok_or(FieldReason::InvalidType)?.trim();
            if !s.validate_email() {
                return Err(FieldReason::InvalidEmail);
            }
            Ok(FieldValue::Text(s.to_string()))
        }
        FieldKind::Phone => {
            let s = value.as_str().ok_or(FieldReason::InvalidType)?.trim();
            if !is_phone(s) {
                return Err(FieldReason::InvalidPhone);
            }
            Ok(FieldValue::Text(s.to_string()))
        }
        FieldKind::DateTime { future } => {
            let s = value.as_str().ok_or(FieldReason::InvalidType)?;
            let instant = parse_datetime(s).ok_or(FieldReason::InvalidDatetime)?;
            if future && instant < now {
                return Err(FieldReason::InPast);
            }
            Ok(FieldValue::Instant(instant))
        }
        FieldKind::Rating => {
            if !value.is_number() {
                return Err(FieldReason::InvalidType);
            }
            let n = value.as_i64().ok_or(FieldReason::OutOfRange)?;
            if !(MIN_RATING..=MAX_RATING).contains(&n) {
                return Err(FieldReason::OutOfRange);
            }
            Ok(FieldValue::Int(n))
        }
        FieldKind::UrlList => {
            let items = value.as_array().ok_or(FieldReason::InvalidType)?;
            let mut urls = Vec::with_capacity(items.len());
            for item in items {
                let url = item.as_str().ok_or(FieldReason::InvalidType)?.trim();
                if !is_web_url(url) {
                    return Err(FieldReason::InvalidUrl);
                }
                urls.push(url.to_string());
            }
            Ok(FieldValue::List(urls))
        }
        FieldKind::Bool => value.as_bool().map(FieldValue::Bool).ok_or(FieldReason::InvalidType),
    }
}

fn is_phone(s: &str) -> bool {
    if s.chars().count() > MAX_PHONE_CHARS {
        return false;
    }
    let allowed = s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.'));
    let digits = s.chars().filter(|c| c.is_ascii_digit()).count();
    allowed && digits >= MIN_PHONE_DIGITS
}

fn is_web_url(s: &str) -> bool {
    (s.starts_with("https://") || s.starts_with("http://")) && s.validate_url()
}

/// Accepts RFC 3339 or a `datetime-local` style value; the latter is read as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let parsed = match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| naive.and_utc()),
    };
    parsed.map(models::at_storage_precision)
}

fn present<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationErrors> {
    value.ok_or_else(|| ValidationErrors::single(field, FieldReason::Missing))
}

fn rating(fields: &mut Fields) -> Result<u8, ValidationErrors> {
    let n = present(fields.int("rating"), "rating")?;
    u8::try_from(n).map_err(|_| ValidationErrors::single("rating", FieldReason::OutOfRange))
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Copies each alias onto its canonical name when the canonical field is
/// absent. The canonical field wins when both are sent.
fn resolve_aliases<'a>(
    payload: &'a Map<String, Value>,
    aliases: &[(&str, &'static str)],
) -> Cow<'a, Map<String, Value>> {
    let mut resolved = Cow::Borrowed(payload);
    for (alias, canonical) in aliases {
        if !is_blank(payload.get(*canonical)) {
            continue;
        }
        if let Some(value) = payload.get(*alias).filter(|v| !is_blank(Some(*v))) {
            resolved.to_mut().insert(canonical.to_string(), value.clone());
        }
    }
    resolved
}

pub fn validate_booking(payload: &Map<String, Value>) -> Result<NewBooking, ValidationErrors> {
    let payload = resolve_aliases(payload, BOOKING_ALIASES);
    let mut fields = check(&payload, BOOKING_SCHEMA)?;
    Ok(NewBooking {
        customer_name: present(fields.text("customerName"), "customerName")?,
        customer_email: present(fields.text("customerEmail"), "customerEmail")?,
        customer_phone: present(fields.text("customerPhone"), "customerPhone")?,
        service_type: present(fields.text("serviceType"), "serviceType")?,
        project_details: fields.text("projectDetails"),
        time_slot: present(fields.instant("timeSlot"), "timeSlot")?,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSubmission {
    pub token: String,
    pub content: ReviewContent,
}

pub fn validate_review_submission(payload: &Map<String, Value>) -> Result<ReviewSubmission, ValidationErrors> {
    let mut fields = check(payload, REVIEW_SUBMISSION_SCHEMA)?;
    Ok(ReviewSubmission {
        token: present(fields.text("token"), "token")?,
        content: ReviewContent {
            rating: rating(&mut fields)?,
            comment: present(fields.text("comment"), "comment")?,
            images: fields.list("images"),
        },
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminReview {
    pub booking_id: String,
    pub customer_name: String,
    pub service_type: String,
    pub content: ReviewContent,
}

pub fn validate_admin_review(payload: &Map<String, Value>) -> Result<AdminReview, ValidationErrors> {
    let mut fields = check(payload, ADMIN_REVIEW_SCHEMA)?;
    Ok(AdminReview {
        booking_id: present(fields.text("bookingId"), "bookingId")?,
        customer_name: present(fields.text("customerName"), "customerName")?,
        service_type: present(fields.text("serviceType"), "serviceType")?,
        content: ReviewContent {
            rating: rating(&mut fields)?,
            comment: present(fields.text("comment"), "comment")?,
            images: fields.list("images"),
        },
    })
}

pub fn validate_publish_update(payload: &Map<String, Value>) -> Result<bool, ValidationErrors> {
    let mut fields = check(payload, PUBLISH_SCHEMA)?;
    present(fields.boolean("isPublished"), "isPublished")
}

pub fn validate_time_slot(payload: &Map<String, Value>) -> Result<NewTimeSlot, ValidationErrors> {
    let mut fields = check(payload, TIME_SLOT_SCHEMA)?;
    let start_time = present(fields.instant("startTime"), "startTime")?;
    let end_time = present(fields.instant("endTime"), "endTime")?;
    if end_time <= start_time {
        return Err(ValidationErrors::single("endTime", FieldReason::OutOfRange));
    }
    Ok(NewTimeSlot { start_time, end_time })
}

/// `?minRating=` on the public listing. Blank means no filter.
pub fn validate_min_rating(raw: Option<&str>) -> Result<Option<u8>, ValidationErrors> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let n: i64 = raw
        .parse()
        .map_err(|_| ValidationErrors::single("minRating", FieldReason::InvalidType))?;
    if !(MIN_RATING..=MAX_RATING).contains(&n) {
        return Err(ValidationErrors::single("minRating", FieldReason::OutOfRange));
    }
    u8::try_from(n).map(Some).map_err(|_| ValidationErrors::single("minRating", FieldReason::OutOfRange))
}

/// `?date=` on the slot listing: a calendar day (`YYYY-MM-DD`, read as the
/// start of that UTC day) or any timestamp [`parse_datetime`] accepts.
/// Blank means `now`. Instants before `now` are clamped to `now`.
pub fn validate_slot_date(raw: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>, ValidationErrors> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(now);
    };
    let from = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .or_else(|| parse_datetime(raw))
        .ok_or_else(|| ValidationErrors::single("date", FieldReason::InvalidDatetime))?;
    Ok(from.max(now))
}
