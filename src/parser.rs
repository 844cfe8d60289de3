//! Extracts structured records from the lookup bot's free-text replies.
//!
//! A reply is a preamble followed by one block per record, each opened by the
//! telephone marker. Every field is searched for independently inside its block,
//! so any subset of them may be missing.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Opens every record in a bot reply. Text before the first marker is preamble.
pub const RECORD_MARKER: &str = "📞Telephone:";

const ADDRESS_LABELS: &[&str] = &["🏘️Adres:", "🏠Adres:"];
const FULL_NAME_LABELS: &[&str] = &["👤Full name:"];
const FATHER_NAME_LABELS: &[&str] = &["👨The name of the father:"];
const REGION_LABELS: &[&str] = &["🗺️ Region:"];
const DOCUMENT_NUMBER_LABELS: &[&str] = &["🃏Document number:"];

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"\d{12,13}"));
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(ADDRESS_LABELS));
static FULL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(FULL_NAME_LABELS));
static FATHER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(FATHER_NAME_LABELS));
static REGION_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(REGION_LABELS));
static DOCUMENT_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| label_regex(DOCUMENT_NUMBER_LABELS));

/// One person/phone entry found in a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
}

impl Record {
    pub fn is_empty(&self) -> bool {
        self.phones.is_empty()
            && self.address.is_none()
            && self.full_name.is_none()
            && self.father_name.is_none()
            && self.region.is_none()
            && self.document_number.is_none()
    }
}

/// Parse a raw bot reply into records, in the order they appear.
///
/// Segments that yield no field at all are dropped. A reply without any
/// [`RECORD_MARKER`] yields nothing.
pub fn parse_bot_response(text: &str) -> Vec<Record> {
    text.split(RECORD_MARKER)
        .skip(1)
        .map(parse_segment)
        .filter(|record| !record.is_empty())
        .collect()
}

fn parse_segment(segment: &str) -> Record {
    Record {
        phones: PHONE_RE
            .find_iter(segment)
            .map(|m| normalize_phone(m.as_str()))
            .collect(),
        address: capture_label(&ADDRESS_RE, segment),
        full_name: capture_label(&FULL_NAME_RE, segment),
        father_name: capture_label(&FATHER_NAME_RE, segment),
        region: capture_label(&REGION_RE, segment),
        document_number: capture_label(&DOCUMENT_NUMBER_RE, segment),
    }
}

fn normalize_phone(digits: &str) -> String {
    if digits.starts_with('+') {
        digits.to_string()
    } else {
        format!("+{}", digits)
    }
}

/// Rest of the line after the first occurrence of the label, trimmed.
fn capture_label(re: &Regex, segment: &str) -> Option<String> {
    re.captures(segment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn label_regex(labels: &[&str]) -> Regex {
    let alternatives: Vec<String> = labels.iter().map(|l| regex::escape(l)).collect();
    compile(&format!(r"(?:{})\s*([^\n]+)", alternatives.join("|")))
}

fn compile(pattern: &str) -> Regex {
    // Patterns are built from constants above; a failure here is a programming error.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid parser pattern {pattern:?}: {e}"))
}
