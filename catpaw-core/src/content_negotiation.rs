//! Content negotiation.
//!
//! [`Accepts`] is what handlers receive: the raw entries of the `Accept`
//! header with quick checks for the content types CatPaw renders.
//! [`MediaType`] and [`negotiate_media_type`] implement q-value aware
//! preference, used when a response has to pick a representation.
//!
//! ```
//! use catpaw_core::content_negotiation::{Accepts, MediaType, negotiate_media_type};
//!
//! let accepts = Accepts::parse("application/xml;q=0.9, application/json");
//! assert!(accepts.json());
//!
//! let available = [MediaType::xml(), MediaType::json()];
//! assert_eq!(
//!     negotiate_media_type(&accepts, &available),
//!     Some(&MediaType::json())
//! );
//! ```

use crate::HttpRequest;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_XML: &str = "application/xml";
pub const TEXT_XML: &str = "text/xml";
pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";

/// A media type without parameters, e.g. `application/json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    pub type_: String,
    pub subtype: String,
}

impl MediaType {
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            subtype: subtype.into(),
        }
    }

    pub fn json() -> Self {
        Self::new("application", "json")
    }

    pub fn xml() -> Self {
        Self::new("application", "xml")
    }

    pub fn text_xml() -> Self {
        Self::new("text", "xml")
    }

    pub fn plain_text() -> Self {
        Self::new("text", "plain")
    }

    pub fn html() -> Self {
        Self::new("text", "html")
    }

    pub fn any() -> Self {
        Self::new("*", "*")
    }

    /// Parse `type/subtype`, dropping any parameters.
    pub fn parse(s: &str) -> Option<Self> {
        let essence = s.split(';').next()?.trim();
        let (type_, subtype) = essence.split_once('/')?;
        let type_ = type_.trim().to_ascii_lowercase();
        let subtype = subtype.trim().to_ascii_lowercase();
        if type_.is_empty() || subtype.is_empty() {
            return None;
        }
        Some(Self { type_, subtype })
    }

    /// Wildcard-aware comparison.
    pub fn matches(&self, other: &MediaType) -> bool {
        let type_matches = self.type_ == "*" || other.type_ == "*" || self.type_ == other.type_;
        let subtype_matches =
            self.subtype == "*" || other.subtype == "*" || self.subtype == other.subtype;
        type_matches && subtype_matches
    }

    pub fn is_json(&self) -> bool {
        self.subtype == "json" || self.subtype.ends_with("+json")
    }

    pub fn is_xml(&self) -> bool {
        self.subtype == "xml" || self.subtype.ends_with("+xml")
    }

    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    fn specificity(&self) -> u8 {
        u8::from(self.type_ != "*") * 2 + u8::from(self.subtype != "*")
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)
    }
}

/// Entries of a request's `Accept` header.
#[derive(Debug, Clone)]
pub struct Accepts {
    raw: Vec<String>,
    /// Parsed entries sorted by quality, then specificity.
    media_types: Vec<(MediaType, f32)>,
}

impl Accepts {
    /// Parse an `Accept` header value.
    pub fn parse(header: &str) -> Self {
        let raw: Vec<String> = header
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect();

        let mut media_types: Vec<(MediaType, f32)> = raw
            .iter()
            .filter_map(|part| {
                let (media, quality) = extract_quality(part);
                MediaType::parse(media).map(|mt| (mt, quality))
            })
            .collect();

        media_types.sort_by(|a, b| match b.1.partial_cmp(&a.1) {
            Some(Ordering::Equal) | None => b.0.specificity().cmp(&a.0.specificity()),
            Some(ord) => ord,
        });

        Self { raw, media_types }
    }

    /// Read the `Accept` header of a request, `*/*` when missing.
    pub fn from_request(request: &HttpRequest) -> Self {
        Self::parse(request.header("accept").unwrap_or("*/*"))
    }

    fn contains(&self, mime: &str) -> bool {
        self.media_types
            .iter()
            .any(|(mt, q)| *q > 0.0 && mt.mime_type() == mime)
    }

    /// The client listed `application/json`.
    pub fn json(&self) -> bool {
        self.contains(APPLICATION_JSON)
    }

    /// The client listed `application/xml` or `text/xml`.
    pub fn xml(&self) -> bool {
        self.contains(APPLICATION_XML) || self.contains(TEXT_XML)
    }

    /// The client listed `text/plain`.
    pub fn plain(&self) -> bool {
        self.contains(TEXT_PLAIN)
    }

    /// The client listed `text/html`.
    pub fn html(&self) -> bool {
        self.contains(TEXT_HTML)
    }

    /// Any raw entry matches `pattern`.
    pub fn matches(&self, pattern: &Regex) -> bool {
        self.raw.iter().any(|entry| pattern.is_match(entry))
    }

    /// Most preferred media type.
    pub fn first(&self) -> Option<&MediaType> {
        self.media_types.first().map(|(mt, _)| mt)
    }

    /// Quality the client assigns to `media_type`, 0 when not accepted.
    pub fn quality_for(&self, media_type: &MediaType) -> f32 {
        self.media_types
            .iter()
            .find(|(mt, _)| mt.matches(media_type))
            .map(|(_, q)| *q)
            .unwrap_or(0.0)
    }

    pub fn entries(&self) -> &[String] {
        &self.raw
    }
}

impl Default for Accepts {
    fn default() -> Self {
        Self::parse("*/*")
    }
}

impl fmt::Display for Accepts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw.join(","))
    }
}

fn extract_quality(s: &str) -> (&str, f32) {
    match s.to_ascii_lowercase().find(";q=") {
        Some(pos) => {
            let quality = s[pos + 3..]
                .split(';')
                .next()
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0)
                .clamp(0.0, 1.0);
            (&s[..pos], quality)
        }
        None => (s, 1.0),
    }
}

/// Pick the best of `available` for the client, by quality then specificity.
pub fn negotiate_media_type<'a>(
    accepts: &Accepts,
    available: &'a [MediaType],
) -> Option<&'a MediaType> {
    let mut best: Option<(&'a MediaType, f32, u8)> = None;

    for candidate in available {
        let quality = accepts.quality_for(candidate);
        if quality <= 0.0 {
            continue;
        }
        let specificity = candidate.specificity();
        let better = match best {
            None => true,
            Some((_, q, s)) => quality > q || (quality == q && specificity > s),
        };
        if better {
            best = Some((candidate, quality, specificity));
        }
    }

    best.map(|(mt, _, _)| mt)
}
