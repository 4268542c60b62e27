//! Response classification for the template endpoint
//!
//! The endpoint answers a download request with the document, an HTML error
//! page, a login wall, or a rate-limit page, and it does not always label the
//! document properly. A 200 response is classified by an ordered chain of
//! predicates; the first one that recognises the response decides its kind:
//!
//! | Order | Predicate | Result |
//! |-------|-----------|--------|
//! | 1 | Content-Type mentions PDF | `Pdf` |
//! | 2 | Content-Type names a Word document | `Word(Modern)` / `Word(Legacy)` |
//! | 3 | Content-Disposition carries a filename | `FromDisposition(ext)` |
//! | 4 | Body starts with `%PDF` | `Pdf` |
//! | - | nothing matched | `Unrecognized` |

use std::path::Path;

/// Magic bytes every PDF file starts with
pub const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Content-Type fragment of `.docx` documents
const DOCX_CONTENT_TYPE: &str = "officedocument.wordprocessingml.document";

/// What the classifier gets to see of a response
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseFacts<'a> {
    pub content_type: Option<&'a str>,
    pub disposition: Option<&'a str>,
    /// Leading bytes of the body
    pub head: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordFormat {
    /// Office Open XML (`.docx`)
    Modern,
    /// Binary Word format (`.doc`)
    Legacy,
}

/// Classification of a 200 response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Pdf,
    Word(WordFormat),
    /// Extension (with leading dot) taken from the Content-Disposition filename
    FromDisposition(String),
    /// Most likely an error page, login wall, or rate-limit page
    Unrecognized,
}

impl ContentKind {
    /// File extension to save under, or None if the response must not be saved
    pub fn extension(&self) -> Option<&str> {
        match self {
            Self::Pdf => Some(".pdf"),
            Self::Word(WordFormat::Modern) => Some(".docx"),
            Self::Word(WordFormat::Legacy) => Some(".doc"),
            Self::FromDisposition(ext) => Some(ext),
            Self::Unrecognized => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

/// One link of the classification chain
pub type Classifier = fn(&ResponseFacts<'_>) -> Option<ContentKind>;

/// The classification chain, in precedence order
pub const CLASSIFIERS: [(&str, Classifier); 4] = [
    ("content-type-pdf", pdf_content_type),
    ("content-type-word", word_content_type),
    ("content-disposition", disposition_filename),
    ("pdf-signature", pdf_signature),
];

/// Classifies a 200 response by running the chain top to bottom
///
/// # Example
///
/// ```
/// use template_harvest::download::{classify, ContentKind, ResponseFacts};
///
/// let facts = ResponseFacts {
///     content_type: None,
///     disposition: None,
///     head: b"%PDF-1.7\n",
/// };
/// assert_eq!(classify(&facts), ContentKind::Pdf);
/// ```
pub fn classify(facts: &ResponseFacts<'_>) -> ContentKind {
    CLASSIFIERS
        .iter()
        .find_map(|(name, classifier)| {
            let kind = classifier(facts)?;
            tracing::trace!("Response classified as {:?} by {}", kind, name);
            Some(kind)
        })
        .unwrap_or(ContentKind::Unrecognized)
}

fn lowered_content_type(facts: &ResponseFacts<'_>) -> Option<String> {
    facts
        .content_type
        .map(str::to_lowercase)
        .filter(|ct| !ct.trim().is_empty())
}

fn pdf_content_type(facts: &ResponseFacts<'_>) -> Option<ContentKind> {
    lowered_content_type(facts)
        .filter(|ct| ct.contains("pdf"))
        .map(|_| ContentKind::Pdf)
}

fn word_content_type(facts: &ResponseFacts<'_>) -> Option<ContentKind> {
    let ct = lowered_content_type(facts)?;
    if ct.contains(DOCX_CONTENT_TYPE) {
        Some(ContentKind::Word(WordFormat::Modern))
    } else if ct.contains("msword") || ct.contains("word") {
        Some(ContentKind::Word(WordFormat::Legacy))
    } else {
        None
    }
}

fn disposition_filename(facts: &ResponseFacts<'_>) -> Option<ContentKind> {
    let filename = parse_content_disposition(facts.disposition?)?;
    Some(ContentKind::FromDisposition(extension_of(&filename)))
}

fn pdf_signature(facts: &ResponseFacts<'_>) -> Option<ContentKind> {
    facts
        .head
        .starts_with(PDF_SIGNATURE)
        .then_some(ContentKind::Pdf)
}

/// Extension of a filename with its leading dot, `.bin` when there is none
fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| ".bin".to_string())
}

/// Parses Content-Disposition header to extract filename.
///
/// Handles:
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf`
/// - `attachment; filename*=UTF-8''example.pdf` (RFC 5987)
pub fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + 10..].trim();
        // charset'language'encoded_value
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            if let Ok(decoded) = urlencoding::decode(encoded[..end].trim()) {
                if !decoded.is_empty() {
                    return Some(decoded.into_owned());
                }
            }
        }
    }

    let pos = header.find("filename=")?;
    let value = header[pos + 9..].trim();

    if let Some(stripped) = value.strip_prefix('"') {
        let end = stripped.find('"').unwrap_or(stripped.len());
        let filename = stripped[..end].trim();
        return (!filename.is_empty()).then(|| filename.to_string());
    }

    let end = value.find(';').unwrap_or(value.len());
    let filename = value[..end].trim();
    (!filename.is_empty()).then(|| filename.to_string())
}
