//! TPS files, as written by the tpsDig family of programs.
//!
//! Each object starts with an `LM=<n>` line followed by one landmark per line
//! and optional `IMAGE=`, `COMMENT=`, `SCALE=` and `ID=` lines:
//!
//! ```text
//! LM=3
//! 10.0 20.0
//! 12.5 21.0
//! 11.0 25.5
//! IMAGE=wing01.jpg
//! SCALE=0.01
//! ID=wing01
//! ```

use crate::{
    Dimension, FileFormat, ImportOptions, ImportedDataset, ImportedObject, ParseError,
    token::{self, format_landmark, push_line},
};

/// Coordinate line with its 1-based line number.
type Point = (usize, Vec<Option<f64>>);

#[derive(Debug, Default)]
struct PendingObject {
    declared_landmarks: usize,
    header_text: String,
    id: Option<String>,
    comment: Option<String>,
    image_path: Option<String>,
    scale: Option<f64>,
    points: Vec<Point>,
}

impl PendingObject {
    fn new(declared_landmarks: usize, header_text: &str) -> Self {
        Self {
            declared_landmarks,
            header_text: header_text.trim().to_owned(),
            ..Self::default()
        }
    }
}

/// Parses TPS content.
///
/// Object names come from `ID=`, then from the text following `LM=<n>`,
/// then from `<dataset>_<k>`. The dimension is 3 when more coordinate lines
/// carry three values than two.
pub fn parse(text: &str, options: &ImportOptions) -> Result<ImportedDataset, ParseError> {
    let mut pending = Vec::<PendingObject>::new();
    let mut two_d_lines = 0_usize;
    let mut three_d_lines = 0_usize;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with(['#', '"', '\'']) {
            continue;
        }

        if let Some((key, value)) = split_keyword(line) {
            if key.eq_ignore_ascii_case("lm") {
                let (count, rest) = token::split_leading_count(value);
                let count = token::parse_count(count, line_no)?;
                pending.push(PendingObject::new(count, rest));
                continue;
            }
            let Some(current) = pending.last_mut() else {
                return Err(ParseError::MissingHeader { expected: "LM=" });
            };
            let value = value.trim();
            match key.to_ascii_lowercase().as_str() {
                "id" => current.id = Some(value.to_owned()),
                "image" => current.image_path = Some(value.to_owned()),
                "comment" => current.comment = Some(value.to_owned()),
                "scale" => {
                    current.scale = token::parse_coord(value, line_no)?;
                }
                other => log::debug!("line {line_no}: ignoring TPS keyword {other}"),
            }
            continue;
        }

        let Some(current) = pending.last_mut() else {
            return Err(ParseError::MissingHeader { expected: "LM=" });
        };
        let coords = line
            .split_whitespace()
            .map(|tok| token::parse_coord(tok, line_no))
            .collect::<Result<Vec<_>, _>>()?;
        if coords.len() < 2 {
            continue;
        }
        if coords.len() >= 3 {
            three_d_lines += 1;
        } else {
            two_d_lines += 1;
        }
        current.points.push((line_no, coords));
    }

    if pending.is_empty() {
        return Err(ParseError::MissingHeader { expected: "LM=" });
    }

    let dimension = if three_d_lines > two_d_lines {
        Dimension::Three
    } else {
        Dimension::Two
    };
    let dim = dimension.as_usize();

    let mut objects = Vec::with_capacity(pending.len());
    for (index, obj) in pending.into_iter().enumerate() {
        if obj.points.is_empty() {
            continue;
        }
        if obj.points.len() != obj.declared_landmarks {
            log::warn!(
                "TPS object {} declares {} landmarks but has {}",
                index + 1,
                obj.declared_landmarks,
                obj.points.len()
            );
        }

        let landmarks = obj
            .points
            .into_iter()
            .map(|(line, mut coords)| {
                if coords.len() < dim {
                    return Err(ParseError::InconsistentLandmarkCount {
                        line,
                        expected: dim,
                        found: coords.len(),
                    });
                }
                coords.truncate(dim);
                Ok(coords)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let header_text = Some(obj.header_text).filter(|s| !s.is_empty());
        let (name, header_comment) = match (obj.id, header_text) {
            (Some(id), header) => (id, header),
            (None, Some(header)) => (header, None),
            (None, None) => (options.generated_object_name(index), None),
        };
        let comment = [header_comment, obj.comment]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        let mut object = ImportedObject::new(name, landmarks);
        object.comment = Some(comment).filter(|c| !c.is_empty());
        object.image_path = obj.image_path;
        object.pixels_per_mm = obj.scale.filter(|s| *s > 0.0).map(|s| 1.0 / s);
        objects.push(object);
    }

    let mut dataset = ImportedDataset::new(
        options.name_or_default(),
        FileFormat::Tps,
        dimension,
        objects,
    );
    dataset.apply_invert_y(options.invert_y);
    Ok(dataset)
}

/// Writes a dataset as TPS text.
///
/// `precision` fixes the number of decimals of every coordinate.
#[must_use]
pub fn write(dataset: &ImportedDataset, precision: Option<usize>) -> String {
    let mut out = String::new();
    for object in &dataset.objects {
        push_line(&mut out, &format!("LM={}", object.landmarks.len()));
        for landmark in &object.landmarks {
            push_line(&mut out, &format_landmark(landmark, precision));
        }
        if let Some(image) = &object.image_path {
            push_line(&mut out, &format!("IMAGE={image}"));
        }
        if let Some(comment) = &object.comment {
            push_line(&mut out, &format!("COMMENT={comment}"));
        }
        if let Some(ppmm) = object.pixels_per_mm.filter(|p| *p > 0.0) {
            push_line(&mut out, &format!("SCALE={}", 1.0 / ppmm));
        }
        push_line(&mut out, &format!("ID={}", object.name));
    }
    out
}

/// Splits `KEY=value` lines; the key must be a single word.
fn split_keyword(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    (!key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_'))
        .then_some((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# digitized by hand
LM=3
1.0 2.0
3.0 4.0
5.0 6.0
IMAGE=a.jpg
ID=first
LM=3 second specimen
1.5 2.5
3.5 NA
5.5 6.5
COMMENT=broken wing
LM=3
0 0
1 0
0 1
SCALE=0.5
";

    #[test]
    fn test_parse_names_and_metadata() {
        let dataset = parse(SAMPLE, &ImportOptions::named("wings")).unwrap();
        assert_eq!(dataset.dimension, Dimension::Two);
        assert_eq!(dataset.objects.len(), 3);

        let names = dataset.objects.iter().map(|o| o.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["first", "second specimen", "wings_3"]);

        assert_eq!(dataset.objects[0].image_path.as_deref(), Some("a.jpg"));
        assert_eq!(dataset.objects[1].comment.as_deref(), Some("broken wing"));
        assert_eq!(dataset.objects[1].landmarks[1], vec![Some(3.5), None]);
        assert_eq!(dataset.objects[2].pixels_per_mm, Some(2.0));
    }

    #[test]
    fn test_header_text_becomes_comment_when_id_present() {
        let text = "LM=2 left side\n0 0\n1 1\nID=s1\n";
        let dataset = parse(text, &ImportOptions::named("d")).unwrap();
        assert_eq!(dataset.objects[0].name, "s1");
        assert_eq!(dataset.objects[0].comment.as_deref(), Some("left side"));
    }

    #[test]
    fn test_three_dimensional_detection() {
        let text = "lm = 2\n0 0 0\n1 2 3\nLM=2\n4 5 6\n7 8 9\n";
        let dataset = parse(text, &ImportOptions::named("d")).unwrap();
        assert_eq!(dataset.dimension, Dimension::Three);
        assert_eq!(dataset.objects[1].landmarks[1], vec![Some(7.0), Some(8.0), Some(9.0)]);
    }

    #[test]
    fn test_invert_y() {
        let options = ImportOptions {
            dataset_name: Some("d".into()),
            invert_y: true,
        };
        let dataset = parse("LM=1\n2 3\n", &options).unwrap();
        assert_eq!(dataset.objects[0].landmarks[0], vec![Some(2.0), Some(-3.0)]);
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            parse("1 2\n3 4\n", &ImportOptions::default()),
            Err(ParseError::MissingHeader { .. })
        ));
    }

    #[test]
    fn test_invalid_number_reports_line() {
        let err = parse("LM=2\n1 2\n3 x\n", &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { line: 3, .. }));
    }

    #[test]
    fn test_declared_count_mismatch_is_kept() {
        let dataset = parse("LM=3\n1 2\n3 4\n", &ImportOptions::default()).unwrap();
        assert_eq!(dataset.objects[0].landmarks.len(), 2);
    }

    #[test]
    fn test_write_then_read_preserves_objects() {
        let dataset = parse(SAMPLE, &ImportOptions::named("wings")).unwrap();
        let text = write(&dataset, Some(3));
        assert!(text.starts_with("LM=3\n1.000\t2.000\n"));
        assert!(text.contains("3.500\tMissing\n"));

        let reread = parse(&text, &ImportOptions::named("wings")).unwrap();
        assert_eq!(reread.objects.len(), 3);
        for (a, b) in dataset.objects.iter().zip(&reread.objects) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.landmarks, b.landmarks);
            assert_eq!(a.pixels_per_mm, b.pixels_per_mm);
        }
    }
}
