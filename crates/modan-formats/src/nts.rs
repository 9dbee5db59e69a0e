//! NTSYS-pc matrix files.
//!
//! The header line is `<type> <rows>[L|B|E] <cols>[L] <missing> [<code>] DIM=<d>`.
//! A row flag `L` puts the object names on their own line(s) after the header,
//! `B` and `E` put each name at the beginning or end of its data row. A column
//! flag `L` means a line of column labels follows, which is skipped. When the
//! missing flag is `1`, values equal to `<code>` are missing.
//!
//! Data rows hold `cols` numbers each and may wrap over several lines.

use std::iter::Peekable;

use crate::{
    Dimension, FileFormat, ImportOptions, ImportedDataset, ImportedObject, ParseError,
    token::{self, split_leading_count},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowLabels {
    None,
    SeparateLine,
    Beginning,
    End,
}

#[derive(Debug)]
struct Header {
    rows: usize,
    cols: usize,
    row_labels: RowLabels,
    column_labels: bool,
    missing_code: Option<String>,
    dimension: Dimension,
}

impl Header {
    fn parse(line: &str, line_no: usize) -> Result<Self, ParseError> {
        let missing_header = || ParseError::MissingHeader {
            expected: "NTS DIM=",
        };
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.len() < 5 {
            return Err(missing_header());
        }

        let (rows, row_flag) = split_leading_count(tokens[1]);
        let (cols, col_flag) = split_leading_count(tokens[2]);
        let rows = token::parse_count(rows, line_no)?;
        let cols = token::parse_count(cols, line_no)?;
        if cols == 0 {
            return Err(ParseError::InvalidNumber {
                line: line_no,
                token: tokens[2].to_owned(),
            });
        }
        let row_labels = match row_flag.to_ascii_lowercase().as_str() {
            "l" => RowLabels::SeparateLine,
            "b" => RowLabels::Beginning,
            "e" => RowLabels::End,
            _ => RowLabels::None,
        };
        let column_labels = col_flag.eq_ignore_ascii_case("l");

        let dim_token = tokens[4..]
            .iter()
            .find_map(|t| {
                let (key, value) = t.split_once('=')?;
                key.eq_ignore_ascii_case("dim").then_some(value)
            })
            .ok_or_else(missing_header)?;
        let dimension = Dimension::try_from(token::parse_count(dim_token, line_no)?)?;

        let missing_code = (tokens[3] == "1")
            .then(|| tokens.get(4).filter(|t| !t.contains('=')))
            .flatten()
            .map(|t| (*t).to_owned());

        Ok(Self {
            rows,
            cols,
            row_labels,
            column_labels,
            missing_code,
            dimension,
        })
    }
}

/// Parses NTS content.
///
/// Lines starting with a quote are collected into the dataset description.
pub fn parse(text: &str, options: &ImportOptions) -> Result<ImportedDataset, ParseError> {
    let mut description = Vec::new();
    let mut header = None;
    let mut body = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with(['"', '\'']) {
            description.push(line.trim_start_matches(['"', '\'']).trim().to_owned());
            continue;
        }
        if header.is_none() {
            header = Some(Header::parse(line, line_no)?);
            continue;
        }
        body.extend(line.split_whitespace().map(|tok| (line_no, tok)));
    }

    let header = header.ok_or(ParseError::MissingHeader {
        expected: "NTS DIM=",
    })?;
    log::debug!("NTS header: {header:?}");

    let mut tokens = body.into_iter().peekable();
    let mut row_names = vec![];
    if header.row_labels == RowLabels::SeparateLine {
        row_names = take_tokens(&mut tokens, header.rows)
            .into_iter()
            .map(|(_, name)| name.to_owned())
            .collect();
    }
    if header.column_labels {
        let _ = take_tokens(&mut tokens, header.cols);
    }

    // `header.rows` is unchecked input, so objects grow with the data actually read.
    let mut objects = Vec::new();
    while objects.len() < header.rows && tokens.peek().is_some() {
        let index = objects.len();
        let mut name = None;
        if header.row_labels == RowLabels::Beginning {
            name = tokens.next().map(|(_, tok)| tok.to_owned());
        }

        let values = take_tokens(&mut tokens, header.cols);
        let last_line = values.last().map_or(0, |(line, _)| *line);
        if values.len() < header.cols {
            return Err(ParseError::InconsistentLandmarkCount {
                line: last_line,
                expected: header.cols,
                found: values.len(),
            });
        }
        let coords = values
            .into_iter()
            .map(|(line, tok)| {
                if header.missing_code.as_deref() == Some(tok) {
                    Ok(None)
                } else {
                    token::parse_coord(tok, line)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if header.row_labels == RowLabels::End {
            name = tokens.next().map(|(_, tok)| tok.to_owned());
        }
        let name = name
            .or_else(|| row_names.get(index).cloned())
            .unwrap_or_else(|| options.generated_object_name(index));

        let landmarks =
            token::group_landmarks(coords, header.dimension.as_usize(), last_line)?;
        objects.push(ImportedObject::new(name, landmarks));
    }

    if objects.len() < header.rows {
        log::warn!(
            "NTS header declares {} objects but {} were read",
            header.rows,
            objects.len()
        );
    }
    if let Some((line, _)) = tokens.peek() {
        log::warn!("ignoring trailing NTS data from line {line}");
    }

    let mut dataset = ImportedDataset::new(
        options.name_or_default(),
        FileFormat::Nts,
        header.dimension,
        objects,
    );
    dataset.description = Some(description.join("\n")).filter(|d| !d.is_empty());
    dataset.apply_invert_y(options.invert_y);
    Ok(dataset)
}

fn take_tokens<'a, I>(tokens: &mut Peekable<I>, count: usize) -> Vec<(usize, &'a str)>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    tokens.by_ref().take(count).collect()
}
