use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::errors::ParseError;

use super::{FormatParser, RestoreItem};

/// AAF class id of `SourceMob` (urn:smpte:ul:060e2b34.0206.0101.0d010101.01013700).
pub(crate) const SOURCE_MOB_CLASS: Uuid = Uuid::from_u128(0x0d010101_0101_3700_060e_2b3402060101);

/// Property id of `Mob::Name`.
pub(crate) const PID_MOB_NAME: u16 = 0x4402;

const PROPERTIES_STREAM: &str = "properties";
const LITTLE_ENDIAN: u8 = 0x4c;
const HEADER_LEN: usize = 4;
const ENTRY_LEN: usize = 6;

/// Reads the names of all source mobs stored in an AAF structured storage file.
pub struct AafParser;

impl FormatParser for AafParser {
    fn parse(&self, path: &Path) -> Result<Vec<RestoreItem>, ParseError> {
        let mut container = cfb::open(path).map_err(|e| container_error(path, e))?;

        let mut mobs: Vec<PathBuf> = container
            .walk()
            .filter(|entry| entry.is_storage() && is_source_mob(entry.clsid()))
            .map(|entry| entry.path().to_path_buf())
            .collect();
        // Directory order is by name length; set elements are keyed by their local index.
        mobs.sort_by_key(|storage| enumeration_key(storage));

        let mut items = Vec::with_capacity(mobs.len());
        for storage in mobs {
            let mut stream = container
                .open_stream(storage.join(PROPERTIES_STREAM))
                .map_err(|e| container_error(path, e))?;
            let mut properties = Vec::new();
            stream
                .read_to_end(&mut properties)
                .map_err(|e| container_error(path, e))?;

            match mob_name(&properties)? {
                Some(name) if !name.trim().is_empty() => items.push(name),
                _ => tracing::debug!("Source mob {} has no name", storage.display()),
            }
        }
        Ok(items)
    }
}

fn container_error(path: &Path, error: std::io::Error) -> ParseError {
    match error.kind() {
        ErrorKind::InvalidData | ErrorKind::UnexpectedEof => ParseError::Container(error.to_string()),
        _ => ParseError::Io {
            path: path.to_path_buf(),
            source: error,
        },
    }
}

fn is_source_mob(clsid: &Uuid) -> bool {
    // Writers disagree on whether the CLSID is stored in GUID (mixed endian) layout.
    *clsid == SOURCE_MOB_CLASS || Uuid::from_bytes_le(*clsid.as_bytes()) == SOURCE_MOB_CLASS
}

/// Storages of a strong reference set are named `<property>{<hex local key>}`.
fn enumeration_key(storage: &Path) -> (PathBuf, u32, String) {
    let parent = storage.parent().map(Path::to_path_buf).unwrap_or_default();
    let name = storage
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let local_key = name
        .strip_suffix('}')
        .and_then(|rest| rest.rsplit_once('{'))
        .and_then(|(_, key)| u32::from_str_radix(key, 16).ok())
        .unwrap_or(u32::MAX);
    (parent, local_key, name)
}

/// Extracts `Mob::Name` from a serialized property set.
///
/// Layout: byte order (`L`), format version, little endian entry count, then one
/// `(pid, stored form, size)` triple per property followed by the property values
/// in the same order.
pub(crate) fn mob_name(properties: &[u8]) -> Result<Option<String>, ParseError> {
    if properties.len() < HEADER_LEN {
        return Err(ParseError::Container("truncated property set".to_string()));
    }
    if properties[0] != LITTLE_ENDIAN {
        return Err(ParseError::Container(format!(
            "unsupported property byte order {:#04x}",
            properties[0]
        )));
    }
    let entry_count = u16::from_le_bytes([properties[2], properties[3]]) as usize;
    let mut value_offset = HEADER_LEN + entry_count * ENTRY_LEN;
    if properties.len() < value_offset {
        return Err(ParseError::Container("truncated property index".to_string()));
    }

    for entry in properties[HEADER_LEN..HEADER_LEN + entry_count * ENTRY_LEN].chunks_exact(ENTRY_LEN) {
        let pid = u16::from_le_bytes([entry[0], entry[1]]);
        let size = u16::from_le_bytes([entry[4], entry[5]]) as usize;
        let value = properties
            .get(value_offset..value_offset + size)
            .ok_or_else(|| ParseError::Container(format!("property {pid:#06x} exceeds property set")))?;
        if pid == PID_MOB_NAME {
            return Ok(Some(decode_utf16(value)));
        }
        value_offset += size;
    }
    Ok(None)
}

fn decode_utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}
