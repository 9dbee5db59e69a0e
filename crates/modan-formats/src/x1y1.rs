//! Tab-separated X1Y1 tables: one object per row after a header row.
//!
//! ```text
//! name	x1	y1	x2	y2
//! s1	0.0	0.0	1.0	0.5
//! ```

use crate::{
    Dimension, FileFormat, ImportOptions, ImportedDataset, ImportedObject, ParseError,
    token::{self, format_landmark},
};

/// Parses X1Y1 content.
///
/// The dimension is read from the header: the data is 2D when the third
/// coordinate label starts with `x` (`x1 y1 x2 ...`), 3D otherwise. Every row
/// has one cell per header label; an empty cell is a missing coordinate.
pub fn parse(text: &str, options: &ImportOptions) -> Result<ImportedDataset, ParseError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_matches(|c: char| c.is_whitespace() && c != '\t')))
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().ok_or(ParseError::MissingHeader {
        expected: "X1Y1 column",
    })?;
    let labels = header
        .split('\t')
        .skip(1)
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>();
    let dimension = match labels.as_slice() {
        [] | [_] => {
            return Err(ParseError::MissingHeader {
                expected: "X1Y1 column",
            });
        }
        [_, _] => Dimension::Two,
        [_, _, third, ..] if third.to_ascii_lowercase().starts_with('x') => Dimension::Two,
        _ => Dimension::Three,
    };

    let mut objects = vec![];
    for (line_no, line) in lines {
        if line.starts_with(['#', '"', '\'']) {
            continue;
        }
        let mut fields = line.split('\t').map(str::trim);
        let name = fields.next().unwrap_or_default().to_owned();
        let coords = fields
            .map(|f| {
                if f.is_empty() {
                    Ok(None)
                } else {
                    token::parse_coord(f, line_no)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        if coords.len() != labels.len() {
            return Err(ParseError::InconsistentLandmarkCount {
                line: line_no,
                expected: labels.len(),
                found: coords.len(),
            });
        }
        let landmarks = token::group_landmarks(coords, dimension.as_usize(), line_no)?;
        objects.push(ImportedObject::new(name, landmarks));
    }

    let mut dataset = ImportedDataset::new(
        options.name_or_default(),
        FileFormat::X1y1,
        dimension,
        objects,
    );
    dataset.apply_invert_y(options.invert_y);
    Ok(dataset)
}

/// Writes a dataset as an X1Y1 table.
#[must_use]
pub fn write(dataset: &ImportedDataset, precision: Option<usize>) -> String {
    let axes: &[&str] = match dataset.dimension {
        Dimension::Two => &["x", "y"],
        Dimension::Three => &["x", "y", "z"],
    };
    let mut out = String::from("name");
    for i in 1..=dataset.landmark_count() {
        for axis in axes {
            out.push_str(&format!("\t{axis}{i}"));
        }
    }
    out.push('\n');

    for object in &dataset.objects {
        out.push_str(&object.name);
        for landmark in &object.landmarks {
            out.push('\t');
            out.push_str(&format_landmark(landmark, precision));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_2d() {
        let text = "name\tx1\ty1\tx2\ty2\nfirst\t0\t1\t2\t3\nsecond\t4\t5\tNA\tNA\n";
        let dataset = parse(text, &ImportOptions::named("d")).unwrap();
        assert_eq!(dataset.dimension, Dimension::Two);
        assert_eq!(dataset.objects[0].name, "first");
        assert_eq!(dataset.objects[0].landmarks[1], vec![Some(2.0), Some(3.0)]);
        assert_eq!(dataset.objects[1].landmarks[1], vec![None, None]);
    }

    #[test]
    fn test_parse_3d() {
        let text = "name\tx1\ty1\tz1\tx2\ty2\tz2\na\t1\t2\t3\t4\t5\t6\n";
        let dataset = parse(text, &ImportOptions::named("d")).unwrap();
        assert_eq!(dataset.dimension, Dimension::Three);
        assert_eq!(dataset.objects[0].landmarks[1], vec![Some(4.0), Some(5.0), Some(6.0)]);
    }

    #[test]
    fn test_incomplete_row() {
        let text = "name\tx1\ty1\tx2\ty2\na\t1\t2\t3\n";
        let err = parse(text, &ImportOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InconsistentLandmarkCount { line: 2, .. }
        ));
    }

    #[test]
    fn test_empty_cell_is_missing() {
        let text = "name\tx1\ty1\tx2\ty2\tx3\ty3\na\t1\t\t3\t4\t5\t6\n";
        let dataset = parse(text, &ImportOptions::named("d")).unwrap();
        let landmarks = &dataset.objects[0].landmarks;
        assert_eq!(landmarks.len(), 3);
        assert_eq!(landmarks[0], vec![Some(1.0), None]);
        assert_eq!(landmarks[1], vec![Some(3.0), Some(4.0)]);
        assert_eq!(landmarks[2], vec![Some(5.0), Some(6.0)]);
    }

    #[test]
    fn test_short_row_does_not_shift_coordinates() {
        let text = "name\tx1\ty1\tx2\ty2\tx3\ty3\na\t1\t\t3\t4\t5\n";
        let err = parse(text, &ImportOptions::named("d")).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InconsistentLandmarkCount {
                line: 2,
                expected: 6,
                found: 5
            }
        ));
    }

    #[test]
    fn test_write_header_and_rows() {
        let text = "name\tx1\ty1\tx2\ty2\na\t1\t2\t3\t4\n";
        let dataset = parse(text, &ImportOptions::named("d")).unwrap();
        assert_eq!(
            write(&dataset, Some(1)),
            "name\tx1\ty1\tx2\ty2\na\t1.0\t2.0\t3.0\t4.0\n"
        );
    }
}
