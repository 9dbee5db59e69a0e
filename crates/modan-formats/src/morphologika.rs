//! Morphologika text files.
//!
//! The file is split into `[section]` blocks. `[individuals]` and
//! `[landmarks]` are required; `[dimensions]` defaults to 2. Landmark rows in
//! `[rawpoints]` are listed object after object, in `[names]` order. Lines
//! starting with `'` are comments.
//!
//! Wireframe edges and polygons are 1-based in the file and 0-based in memory.

use std::collections::HashMap;

use crate::{
    Dimension, FileFormat, ImportOptions, ImportedDataset, ImportedObject, ParseError,
    token::{self, format_landmark, push_line},
};

type Section<'a> = Vec<(usize, &'a str)>;

/// Parses Morphologika content.
pub fn parse(text: &str, options: &ImportOptions) -> Result<ImportedDataset, ParseError> {
    let sections = split_sections(text);

    let individuals = required_count(&sections, "individuals")?;
    let landmark_count = required_count(&sections, "landmarks")?;
    let dimension = match first_line(&sections, "dimensions") {
        Some((line, value)) => Dimension::try_from(token::parse_count(value, line)?)?,
        None => Dimension::Two,
    };
    let dim = dimension.as_usize();

    let names = section(&sections, "names");
    let rawpoints = section(&sections, "rawpoints");
    let label_values = section(&sections, "labelvalues");
    let images = section(&sections, "images");
    let pixels_per_mm = section(&sections, "pixelspermm");

    if names.len() != individuals {
        log::warn!(
            "Morphologika file declares {individuals} individuals but lists {} names",
            names.len()
        );
    }

    if landmark_count == 0 {
        let line = first_line(&sections, "landmarks").map_or(0, |(line, _)| line);
        return Err(ParseError::InvalidNumber {
            line,
            token: "0".to_owned(),
        });
    }
    // Header counts are only trusted once the rows they describe are present.
    let row_count = individuals
        .checked_mul(landmark_count)
        .filter(|rows| *rows <= rawpoints.len())
        .ok_or_else(|| ParseError::InconsistentLandmarkCount {
            line: rawpoints.last().map_or(0, |(line, _)| *line),
            expected: individuals.saturating_mul(landmark_count),
            found: rawpoints.len(),
        })?;

    let mut objects = Vec::with_capacity(individuals);
    for (index, rows) in rawpoints[..row_count].chunks_exact(landmark_count).enumerate() {
        let landmarks = rows
            .iter()
            .map(|&(line, row)| {
                let coords = row
                    .split_whitespace()
                    .take(dim)
                    .map(|tok| token::parse_coord(tok, line))
                    .collect::<Result<Vec<_>, _>>()?;
                if coords.len() < dim {
                    return Err(ParseError::InconsistentLandmarkCount {
                        line,
                        expected: dim,
                        found: coords.len(),
                    });
                }
                Ok(coords)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let name = names
            .get(index)
            .map_or_else(|| options.generated_object_name(index), |(_, n)| (*n).to_owned());
        let mut object = ImportedObject::new(name, landmarks);
        if let Some((_, values)) = label_values.get(index) {
            object.variables = values.split_whitespace().map(str::to_owned).collect();
        }
        if let Some((_, image)) = images.get(index) {
            object.image_path = Some((*image).to_owned());
        }
        if let Some(&(line, ppmm)) = pixels_per_mm.get(index) {
            object.pixels_per_mm = token::parse_coord(ppmm, line)?;
        }
        objects.push(object);
    }

    let mut dataset = ImportedDataset::new(
        options.name_or_default(),
        FileFormat::Morphologika,
        dimension,
        objects,
    );
    dataset.variable_names = section(&sections, "labels")
        .iter()
        .flat_map(|(_, line)| line.split_whitespace())
        .map(str::to_owned)
        .collect();

    dataset.edges = index_lists(section(&sections, "wireframe"))?
        .into_iter()
        .map(|(line, edge)| match edge.as_slice() {
            &[a, b] => Ok([a, b]),
            _ => Err(ParseError::InconsistentLandmarkCount {
                line,
                expected: 2,
                found: edge.len(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    dataset.edges.sort_unstable();

    dataset.polygons = index_lists(section(&sections, "polygons"))?
        .into_iter()
        .map(|(_, polygon)| polygon)
        .collect();
    dataset.polygons.sort();

    dataset.apply_invert_y(options.invert_y);
    Ok(dataset)
}

/// Writes a dataset as Morphologika text.
///
/// `[images]` and `[pixelspermm]` are written only when every object has a value.
#[must_use]
pub fn write(dataset: &ImportedDataset, precision: Option<usize>) -> String {
    let mut out = String::new();
    push_line(&mut out, &format!("[individuals]\n{}", dataset.objects.len()));
    push_line(&mut out, &format!("[landmarks]\n{}", dataset.landmark_count()));
    push_line(&mut out, &format!("[dimensions]\n{}", dataset.dimension.as_usize()));

    out.push_str("[names]\n");
    for object in &dataset.objects {
        push_line(&mut out, &object.name);
    }

    if !dataset.variable_names.is_empty() {
        push_line(&mut out, &format!("[labels]\n{}", dataset.variable_names.join("\t")));
        out.push_str("[labelvalues]\n");
        for object in &dataset.objects {
            push_line(&mut out, &object.variables.join("\t"));
        }
    }

    out.push_str("[rawpoints]\n");
    for object in &dataset.objects {
        push_line(&mut out, &format!("'#{}", object.name));
        for landmark in &object.landmarks {
            push_line(&mut out, &format_landmark(landmark, precision));
        }
    }

    if !dataset.edges.is_empty() {
        out.push_str("[wireframe]\n");
        for [a, b] in &dataset.edges {
            push_line(&mut out, &format!("{}\t{}", a + 1, b + 1));
        }
    }
    if !dataset.polygons.is_empty() {
        out.push_str("[polygons]\n");
        for polygon in &dataset.polygons {
            let line = polygon
                .iter()
                .map(|i| (i + 1).to_string())
                .collect::<Vec<_>>()
                .join("\t");
            push_line(&mut out, &line);
        }
    }

    let images = dataset
        .objects
        .iter()
        .map(|o| o.image_path.as_deref())
        .collect::<Option<Vec<_>>>();
    if let Some(images) = images.filter(|v| !v.is_empty()) {
        out.push_str("[images]\n");
        for image in images {
            push_line(&mut out, image);
        }
    }
    let ppmm = dataset
        .objects
        .iter()
        .map(|o| o.pixels_per_mm)
        .collect::<Option<Vec<_>>>();
    if let Some(ppmm) = ppmm.filter(|v| !v.is_empty()) {
        out.push_str("[pixelspermm]\n");
        for value in ppmm {
            push_line(&mut out, &value.to_string());
        }
    }
    out
}

fn split_sections(text: &str) -> HashMap<String, Section<'_>> {
    let mut sections = HashMap::<String, Section<'_>>::new();
    let mut current = None;
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('\'') {
            continue;
        }
        if let Some(rest) = line.strip_prefix('[') {
            let name = rest.trim_end_matches(']').trim().to_ascii_lowercase();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        match &current {
            Some(name) => sections.entry(name.clone()).or_default().push((idx + 1, line)),
            None => log::warn!("line {}: data outside of any section", idx + 1),
        }
    }
    sections
}

fn section<'s, 'a>(
    sections: &'s HashMap<String, Section<'a>>,
    name: &str,
) -> &'s [(usize, &'a str)] {
    sections.get(name).map(Vec::as_slice).unwrap_or_default()
}

fn first_line<'a>(
    sections: &HashMap<String, Section<'a>>,
    name: &str,
) -> Option<(usize, &'a str)> {
    section(sections, name).first().copied()
}

fn required_count(
    sections: &HashMap<String, Section<'_>>,
    name: &'static str,
) -> Result<usize, ParseError> {
    let (line, value) = first_line(sections, name).ok_or(ParseError::MissingSection { name })?;
    token::parse_count(value, line)
}

/// Parses rows of 1-based landmark indices into sorted 0-based lists.
fn index_lists(rows: &[(usize, &str)]) -> Result<Vec<(usize, Vec<usize>)>, ParseError> {
    rows.iter()
        .map(|&(line, row)| {
            let mut indices = row
                .split_whitespace()
                .map(|tok| {
                    token::parse_count(tok, line)?
                        .checked_sub(1)
                        .ok_or_else(|| ParseError::InvalidNumber {
                            line,
                            token: tok.to_owned(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            indices.sort_unstable();
            Ok((line, indices))
        })
        .collect()
}
