pub(crate) mod aaf; // Binary AAF container (source mobs)
pub(crate) mod ale; // Tab delimited Avid Log Exchange
pub(crate) mod edl; // CMX style edit decision list

use std::path::Path;

use crate::errors::ParseError;

/// Identifier of one piece of media to restore, usually a source file name.
pub type RestoreItem = String;

/// Shared contract of all metadata file readers.
///
/// Implementations return items in file order and never deduplicate; collapsing
/// repeated items is left to the caller.
pub trait FormatParser {
    fn parse(&self, path: &Path) -> Result<Vec<RestoreItem>, ParseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFormat {
    Ale,
    Aaf,
    Edl,
}

impl MetadataFormat {
    /// Detects the format from the file extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "ale" => Some(MetadataFormat::Ale),
            "aaf" => Some(MetadataFormat::Aaf),
            "edl" => Some(MetadataFormat::Edl),
            _ => None,
        }
    }

    pub fn parser(self) -> &'static dyn FormatParser {
        match self {
            MetadataFormat::Ale => &ale::AleParser,
            MetadataFormat::Aaf => &aaf::AafParser,
            MetadataFormat::Edl => &edl::EdlParser,
        }
    }
}

/// Parses `path` with the reader matching its extension.
pub fn parse_file(path: &Path) -> Result<Vec<RestoreItem>, ParseError> {
    let format = MetadataFormat::from_path(path)
        .ok_or_else(|| ParseError::UnsupportedFormat(path.to_path_buf()))?;
    let items = format.parser().parse(path)?;
    if items.is_empty() {
        return Err(ParseError::NoItems);
    }
    tracing::debug!("Parsed {} items from {} ({:?})", items.len(), path.display(), format);
    Ok(items)
}

pub(crate) fn read_text(path: &Path) -> Result<String, ParseError> {
    let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
