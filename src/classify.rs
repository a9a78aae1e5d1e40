//! Content- and extension-based file classification.
//!
//! This module decides which top-level bucket a file belongs to. Extension
//! overrides are checked first (no I/O), then the file content is sniffed
//! for a MIME type which is mapped to a category.
//!
//! # Examples
//!
//! ```
//! use chronotidy::classify::Category;
//!
//! assert_eq!(Category::from_mime("image/png"), Category::Image);
//! assert_eq!(Category::from_mime("application/pdf"), Category::Pdf);
//! assert_eq!(
//!     Category::from_mime("application/x-bzip2"),
//!     Category::Derived("APPLICATION_X-BZIP2".to_string())
//! );
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Filename prefix used by Office for autosave/lock files.
const OFFICE_AUTOSAVE_PREFIX: &str = "~$";

/// How many leading bytes are read for content sniffing.
const SNIFF_LEN: usize = 8192;

/// The bucket a file is sorted into.
///
/// Fixed categories map to fixed directory names; a MIME type with no fixed
/// mapping becomes a `Derived` category named after the MIME string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Image,
    Video,
    Audio,
    Pdf,
    Archive,
    Text,
    Office,
    Ebook,
    Application,
    /// Sentinel: the file must not be moved at all.
    Skip,
    /// Content could not be read or identified.
    Unknown,
    /// Upper-cased MIME type with `/` replaced by `_`, e.g. `APPLICATION_GZIP`.
    Derived(String),
}

impl Category {
    /// Maps a sniffed MIME type to a category.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            Category::Image
        } else if mime.starts_with("video/") {
            Category::Video
        } else if mime.starts_with("audio/") {
            Category::Audio
        } else if mime == "application/pdf" {
            Category::Pdf
        } else if mime == "application/zip" {
            Category::Archive
        } else if mime.starts_with("text/") {
            Category::Text
        } else {
            Category::Derived(mime.to_uppercase().replace('/', "_"))
        }
    }

    /// Returns the directory name used as the top-level bucket.
    ///
    /// # Examples
    ///
    /// ```
    /// use chronotidy::classify::Category;
    ///
    /// assert_eq!(Category::Image.dir_name(), "IMAGE");
    /// assert_eq!(Category::Unknown.dir_name(), "UNKNOWN");
    /// ```
    pub fn dir_name(&self) -> &str {
        match self {
            Category::Image => "IMAGE",
            Category::Video => "VIDEO",
            Category::Audio => "AUDIO",
            Category::Pdf => "PDF",
            Category::Archive => "ARCHIVE",
            Category::Text => "TEXT",
            Category::Office => "OFFICE",
            Category::Ebook => "EBOOK",
            Category::Application => "APPLICATION",
            Category::Skip => "SKIP",
            Category::Unknown => "UNKNOWN",
            Category::Derived(name) => name,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// The result of classifying a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The sniffed MIME type, when content inspection ran and succeeded.
    pub mime_type: Option<String>,
    /// The bucket the file belongs to.
    pub category: Category,
}

/// Classifies a file by name, extension and content.
///
/// Rules are applied in order:
/// 1. Office autosave names (`~$...`) are `Skip`, before any I/O.
/// 2. A fixed set of extension overrides (office documents, e-books,
///    executables, HEIC images) wins over content sniffing.
/// 3. The content is sniffed for a MIME type and mapped via
///    [`Category::from_mime`].
/// 4. Unreadable or unidentifiable content yields `Unknown`; this is
///    non-fatal and such files are routed to the `UNKNOWN` bucket.
pub fn classify(path: &Path) -> Classification {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    if name.starts_with(OFFICE_AUTOSAVE_PREFIX) {
        return Classification {
            mime_type: None,
            category: Category::Skip,
        };
    }

    if let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_lowercase()) {
        let category = match ext.as_str() {
            "docx" | "xlsx" | "pptx" => Some(Category::Office),
            "epub" => Some(Category::Ebook),
            "exe" | "app" | "dmg" => Some(Category::Application),
            // No reliable sniff signature for HEIC in every container variant.
            "heic" => Some(Category::Image),
            _ => None,
        };
        if let Some(category) = category {
            return Classification {
                mime_type: None,
                category,
            };
        }
    }

    match sniff(path) {
        Ok(Some(mime)) => {
            let category = Category::from_mime(&mime);
            Classification {
                mime_type: Some(mime),
                category,
            }
        }
        Ok(None) => Classification {
            mime_type: None,
            category: Category::Unknown,
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not sniff file content");
            Classification {
                mime_type: None,
                category: Category::Unknown,
            }
        }
    }
}

/// Sniffs a MIME type from the leading bytes of a file.
///
/// Uses the `infer` crate for magic-number detection, falling back to a
/// plain-text heuristic since text files carry no magic number. Returns
/// `Ok(None)` when the content cannot be identified.
pub fn sniff(path: &Path) -> io::Result<Option<String>> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; SNIFF_LEN];
    let mut filled = 0;
    // A single read may return short; fill as much of the sample as we can.
    loop {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == buf.len() {
            break;
        }
    }
    let sample = &buf[..filled];

    if let Some(kind) = infer::get(sample) {
        return Ok(Some(kind.mime_type().to_string()));
    }

    if !sample.is_empty() && looks_like_text(sample) {
        return Ok(Some("text/plain".to_string()));
    }

    Ok(None)
}

/// Heuristic for text content: no NUL bytes and almost all bytes printable,
/// whitespace, or part of a multi-byte sequence.
fn looks_like_text(sample: &[u8]) -> bool {
    if sample.contains(&0) {
        return false;
    }
    let textual = sample
        .iter()
        .filter(|b| b.is_ascii_graphic() || b.is_ascii_whitespace() || **b >= 0x80)
        .count();
    textual * 10 >= sample.len() * 9
}
