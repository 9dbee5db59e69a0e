//! Coordinate tokens shared by all formats.

use crate::{ParseError, RawLandmark};

/// Returns `true` for the tokens used to mark a missing coordinate.
pub(crate) fn is_missing(token: &str) -> bool {
    token.eq_ignore_ascii_case("missing") || token.eq_ignore_ascii_case("na")
}

/// Parses one coordinate token; missing markers become `None`.
pub(crate) fn parse_coord(token: &str, line: usize) -> Result<Option<f64>, ParseError> {
    if is_missing(token) {
        return Ok(None);
    }
    token
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ParseError::InvalidNumber {
            line,
            token: token.to_owned(),
        })
}

/// Parses a whole-number token such as a count or a landmark index.
pub(crate) fn parse_count(token: &str, line: usize) -> Result<usize, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_owned(),
    })
}

/// Splits `"12 rest of text"` into the leading digits and the remainder.
pub(crate) fn split_leading_count(value: &str) -> (&str, &str) {
    let value = value.trim_start();
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value.split_at(end)
}

/// Groups a flat list of coordinates into landmarks of `dimension` values.
///
/// A trailing partial group is an error.
pub(crate) fn group_landmarks(
    coords: Vec<Option<f64>>,
    dimension: usize,
    line: usize,
) -> Result<Vec<RawLandmark>, ParseError> {
    if coords.len() % dimension != 0 {
        return Err(ParseError::InconsistentLandmarkCount {
            line,
            expected: coords.len().next_multiple_of(dimension),
            found: coords.len(),
        });
    }
    Ok(coords
        .chunks_exact(dimension)
        .map(<[Option<f64>]>::to_vec)
        .collect())
}

/// Appends `line` and a newline to `out`.
pub(crate) fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

/// Formats one coordinate for export.
///
/// `None` is written as `Missing`; `precision` fixes the number of decimals.
pub(crate) fn format_coord(value: Option<f64>, precision: Option<usize>) -> String {
    match (value, precision) {
        (None, _) => "Missing".to_owned(),
        (Some(v), Some(p)) => format!("{v:.p$}"),
        (Some(v), None) => v.to_string(),
    }
}

pub(crate) fn format_landmark(landmark: &[Option<f64>], precision: Option<usize>) -> String {
    landmark
        .iter()
        .map(|&c| format_coord(c, precision))
        .collect::<Vec<_>>()
        .join("\t")
}
