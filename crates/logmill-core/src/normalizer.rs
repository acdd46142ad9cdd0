//! Normalizer — parses raw log text into structured [`AttributeTree`] values.
//!
//! One parser per [`LogFormat`]. Every parser is a pure function of the input
//! line: it never panics and never fails the batch it belongs to. A line that
//! does not fit its format yields a [`ParseError`], which the ingestor records
//! next to the untouched raw text.
//!
//! # Formats
//!
//! | Tag | Output |
//! |-----|--------|
//! | `json` | the decoded JSON value, any shape |
//! | `xml` | `{tag, content, attrs?, children?}` per element, recursively |
//! | `apache` | `{ip, time, request, status, size, timestamp?}` |
//! | `nginx` | as `apache`, plus `referer` / `userAgent` for the combined tail |
//! | `syslog` | `{month, day, time, host, process, message}` (BSD style, no year) |
//! | `csv` | `{field1 .. fieldN}`, naive comma split, values trimmed |
//! | `plain` | `{message}` |

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ParseError;
use crate::types::AttributeTree;

// ---------------------------------------------------------------------------
// Format tags
// ---------------------------------------------------------------------------

/// Format of a batch of raw lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "String")]
pub enum LogFormat {
    #[default]
    Json,
    Xml,
    ApacheCommonLog,
    NginxCombinedLog,
    Syslog,
    Csv,
    Plain,
}

impl LogFormat {
    /// Resolve an optional format tag. Missing or unknown tags fall back to
    /// [`LogFormat::Json`]; this never fails.
    pub fn from_tag(tag: Option<&str>) -> Self {
        tag.and_then(|t| t.parse().ok()).unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Xml => "xml",
            LogFormat::ApacheCommonLog => "apache",
            LogFormat::NginxCombinedLog => "nginx",
            LogFormat::Syslog => "syslog",
            LogFormat::Csv => "csv",
            LogFormat::Plain => "plain",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned by [`LogFormat::from_str`] for tags that name no known format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl FromStr for LogFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "xml" => Ok(LogFormat::Xml),
            "apache" | "apachecommonlog" | "clf" => Ok(LogFormat::ApacheCommonLog),
            "nginx" | "nginxcombinedlog" | "combined" => Ok(LogFormat::NginxCombinedLog),
            "syslog" => Ok(LogFormat::Syslog),
            "csv" => Ok(LogFormat::Csv),
            "plain" | "text" => Ok(LogFormat::Plain),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

impl From<String> for LogFormat {
    fn from(tag: String) -> Self {
        LogFormat::from_tag(Some(&tag))
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse one raw line in the given format.
pub fn parse(raw: &str, format: LogFormat) -> Result<AttributeTree, ParseError> {
    match format {
        LogFormat::Json => parse_json(raw),
        LogFormat::Xml => parse_xml(raw),
        LogFormat::ApacheCommonLog => parse_access(raw, &APACHE_COMMON, "apache"),
        LogFormat::NginxCombinedLog => parse_access(raw, &NGINX_COMBINED, "nginx"),
        LogFormat::Syslog => parse_syslog(raw),
        LogFormat::Csv => Ok(parse_csv(raw)),
        LogFormat::Plain => Ok(AttributeTree::object([("message", raw.into())])),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn parse_json(raw: &str) -> Result<AttributeTree, ParseError> {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(AttributeTree::from)
        .map_err(|e| ParseError::Malformed {
            format: "json",
            reason: e.to_string(),
        })
}

// ---------------------------------------------------------------------------
// XML
// ---------------------------------------------------------------------------

fn parse_xml(raw: &str) -> Result<AttributeTree, ParseError> {
    let doc = roxmltree::Document::parse(raw).map_err(|e| ParseError::Malformed {
        format: "xml",
        reason: e.to_string(),
    })?;
    Ok(element_to_tree(doc.root_element()))
}

fn element_to_tree(node: roxmltree::Node<'_, '_>) -> AttributeTree {
    let content: String = node
        .children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect();

    let mut map = BTreeMap::new();
    map.insert("tag".to_string(), node.tag_name().name().into());
    map.insert("content".to_string(), content.trim().into());

    let attrs: BTreeMap<String, AttributeTree> = node
        .attributes()
        .map(|a| (a.name().to_string(), a.value().into()))
        .collect();
    if !attrs.is_empty() {
        map.insert("attrs".to_string(), AttributeTree::Object(attrs));
    }

    let children: Vec<AttributeTree> = node
        .children()
        .filter(|c| c.is_element())
        .map(element_to_tree)
        .collect();
    if !children.is_empty() {
        map.insert("children".to_string(), AttributeTree::Array(children));
    }

    AttributeTree::Object(map)
}

// ---------------------------------------------------------------------------
// Access logs (Apache common, nginx combined)
// ---------------------------------------------------------------------------

static APACHE_COMMON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?P<ip>\S+) \S+ \S+ \[(?P<time>[^\]]+)\] "(?P<request>[^"]+)" (?P<status>\d{3}) (?P<size>\S+)$"#,
    )
    .expect("apache common log grammar must compile")
});

static NGINX_COMBINED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?P<ip>\S+) - \S+ \[(?P<time>[^\]]+)\] "(?P<request>[^"]+)" (?P<status>\d{3}) (?P<size>\d+)(?: "(?P<referer>[^"]*)" "(?P<userAgent>[^"]*)")?$"#,
    )
    .expect("nginx combined log grammar must compile")
});

const ACCESS_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

fn parse_access(raw: &str, grammar: &Regex, format: &'static str) -> Result<AttributeTree, ParseError> {
    let caps = grammar
        .captures(raw)
        .ok_or(ParseError::NoMatch { format })?;

    let mut map = BTreeMap::new();
    for name in ["ip", "time", "request", "status", "size", "referer", "userAgent"] {
        if let Some(m) = caps.name(name) {
            map.insert(name.to_string(), m.as_str().into());
        }
    }
    if let Some(ts) = access_timestamp(&caps["time"]) {
        map.insert("timestamp".to_string(), ts.into());
    }
    Ok(AttributeTree::Object(map))
}

/// Normalise an access-log time (`10/Oct/2000:13:55:36 -0700`) to an RFC 3339
/// UTC string. Unparseable times leave the field out.
fn access_timestamp(time: &str) -> Option<String> {
    DateTime::parse_from_str(time, ACCESS_TIME_FORMAT)
        .ok()
        .map(|t| {
            t.with_timezone(&Utc)
                .format("%Y-%m-%dT%H:%M:%SZ")
                .to_string()
        })
}

// ---------------------------------------------------------------------------
// Syslog (BSD)
// ---------------------------------------------------------------------------

// The BSD grammar carries no year, so no UTC timestamp is derived.
static SYSLOG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<month>\w{3})\s+(?P<day>\d{1,2})\s+(?P<time>\d{2}:\d{2}:\d{2})\s+(?P<host>\S+)\s+(?P<process>[^:]+):\s+(?P<message>.+)$",
    )
    .expect("syslog grammar must compile")
});

fn parse_syslog(raw: &str) -> Result<AttributeTree, ParseError> {
    let caps = SYSLOG
        .captures(raw)
        .ok_or(ParseError::NoMatch { format: "syslog" })?;
    Ok(AttributeTree::object(
        ["month", "day", "time", "host", "process", "message"]
            .into_iter()
            .map(|name| (name, caps[name].into())),
    ))
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

// No quoting or escaping: a comma inside a value splits it.
fn parse_csv(raw: &str) -> AttributeTree {
    AttributeTree::object(
        raw.split(',')
            .enumerate()
            .map(|(i, field)| (format!("field{}", i + 1), field.trim().into())),
    )
}

// ---------------------------------------------------------------------------
// Level derivation
// ---------------------------------------------------------------------------

const LEVEL_KEYS: &[&str] = &["level", "severity", "lvl", "log.level"];

/// Best-effort severity for a parsed line: the first string-valued level key
/// at the top level, upper-cased and folded onto the names the dashboard
/// counts (`ERROR`, `WARNING`, `INFO`). Empty when no level key is present.
pub fn derive_level(data: &AttributeTree) -> String {
    let Some(raw) = LEVEL_KEYS
        .iter()
        .find_map(|key| data.get(key).and_then(AttributeTree::as_str))
    else {
        return String::new();
    };

    let upper = raw.trim().to_ascii_uppercase();
    match upper.as_str() {
        "WARN" => "WARNING".to_string(),
        "ERR" => "ERROR".to_string(),
        "INFORMATION" => "INFO".to_string(),
        _ => upper,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
