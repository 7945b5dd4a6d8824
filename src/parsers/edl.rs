use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ParseError;

use super::{FormatParser, RestoreItem, read_text};

/// Event lines start with a (zero padded) event number.
static EVENT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}").expect("valid static regex"));

/// Reads the reel/clip name of every event line of an EDL.
pub struct EdlParser;

impl FormatParser for EdlParser {
    fn parse(&self, path: &Path) -> Result<Vec<RestoreItem>, ParseError> {
        Ok(parse_edl(&read_text(path)?))
    }
}

pub(crate) fn parse_edl(content: &str) -> Vec<RestoreItem> {
    content
        .lines()
        .filter(|line| EVENT_LINE.is_match(line))
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}
