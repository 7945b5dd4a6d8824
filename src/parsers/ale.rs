use std::path::Path;

use crate::errors::ParseError;

use super::{FormatParser, RestoreItem, read_text};

const COLUMN_MARKER: &str = "Column";
const DATA_MARKER: &str = "Data";
const SOURCE_FILE_LABEL: &str = "Source File";

/// Reads the "Source File" column of the data section of an ALE file.
pub struct AleParser;

impl FormatParser for AleParser {
    fn parse(&self, path: &Path) -> Result<Vec<RestoreItem>, ParseError> {
        parse_ale(&read_text(path)?)
    }
}

/// ALE layout: a `Heading` block, a `Column` marker followed by one line of tab
/// separated column names, then a `Data` marker followed by one row per clip.
pub(crate) fn parse_ale(content: &str) -> Result<Vec<RestoreItem>, ParseError> {
    let lines: Vec<&str> = content.lines().collect();
    let mut source_column = None;
    let mut data_start = None;

    for (line_nr, line) in lines.iter().enumerate() {
        let marker = line.trim();
        if marker == COLUMN_MARKER {
            source_column = lines
                .get(line_nr + 1)
                .and_then(|header| header.split('\t').position(|c| c.contains(SOURCE_FILE_LABEL)));
        }
        if marker == DATA_MARKER {
            data_start = Some(line_nr + 1);
            break;
        }
    }

    let data_start = data_start.ok_or(ParseError::MissingDataSection)?;
    let column = source_column.ok_or(ParseError::MissingSourceColumn)?;

    let rows: Vec<&str> = lines[data_start..]
        .iter()
        .copied()
        .filter(|row| !row.trim().is_empty())
        .collect();
    if rows.is_empty() {
        return Err(ParseError::EmptyDataSection);
    }

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        match row.split('\t').nth(column) {
            Some(field) if field.trim().is_empty() => {
                tracing::debug!("ALE row without source file: {:?}", row)
            }
            Some(field) => items.push(field.trim_end_matches(['\r', '\n']).to_string()),
            None => tracing::debug!("ALE row without column {}: {:?}", column, row),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ale(columns: &str, rows: &[&str]) -> String {
        let mut content = String::from(
            "Heading\nFIELD_DELIM\tTABS\nVIDEO_FORMAT\t1080\nFPS\t25\n\nColumn\n",
        );
        content.push_str(columns);
        content.push_str("\n\nData\n");
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        content
    }

    #[test]
    fn yields_source_file_column_in_row_order() -> anyhow::Result<()> {
        let content = ale(
            "Name\tTracks\tStart\tSource File\tTape",
            &[
                "clip 1\tV\t10:00:00:00\tA001C003_220101.mov\tA001",
                "clip 2\tV\t10:01:00:00\tA001C001_220101.mov\tA001",
                "clip 3\tV\t10:02:00:00\tB002C010_220101.mxf\tB002",
            ],
        );
        assert_eq!(
            parse_ale(&content)?,
            vec![
                "A001C003_220101.mov".to_string(),
                "A001C001_220101.mov".to_string(),
                "B002C010_220101.mxf".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn last_column_is_stripped_of_line_terminators() -> anyhow::Result<()> {
        let content = ale("Name\tSource File", &["clip 1\tA.mov\r", "clip 2\tB.mov\r"]);
        assert_eq!(parse_ale(&content)?, vec!["A.mov".to_string(), "B.mov".to_string()]);
        Ok(())
    }

    #[test]
    fn blank_source_cells_are_skipped() -> anyhow::Result<()> {
        let content = ale("Name\tSource File", &["clip 1\tA.mov", "title card\t", "clip 2\t  \r"]);
        assert_eq!(parse_ale(&content)?, vec!["A.mov".to_string()]);
        Ok(())
    }

    #[test]
    fn duplicates_are_preserved() -> anyhow::Result<()> {
        let content = ale("Source File\tName", &["A.mov\tone", "A.mov\ttwo", "B.mov\tthree"]);
        assert_eq!(parse_ale(&content)?.len(), 3);
        Ok(())
    }

    #[test]
    fn missing_data_marker_fails() {
        let content = "Heading\nFIELD_DELIM\tTABS\n\nColumn\nName\tSource File\n";
        assert!(matches!(parse_ale(content), Err(ParseError::MissingDataSection)));
    }

    #[test]
    fn empty_data_section_fails() {
        let content = ale("Name\tSource File", &[]);
        assert!(matches!(parse_ale(&content), Err(ParseError::EmptyDataSection)));
    }

    #[test]
    fn missing_source_file_column_fails() {
        let content = ale("Name\tTape", &["clip 1\tA001"]);
        assert!(matches!(parse_ale(&content), Err(ParseError::MissingSourceColumn)));
    }
}
