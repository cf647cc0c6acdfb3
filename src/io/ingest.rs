//! Delimited tuple ingest.
//!
//! This module turns a loosely formatted text file into a dense, rectangular
//! numeric `Table` that is safe to fit.
//!
//! Design goals:
//! - **Tolerant rows**: a malformed field never aborts the read unless the
//!   caller asks for it (`ParseFailurePolicy::Abort`)
//! - **Row-level diagnostics**: every recovered problem is reported with its line
//! - **Deterministic order**: table rows mirror file order
//! - **Separation of concerns**: no fitting logic here

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::collections::RecordList;
use crate::domain::{ParseFailurePolicy, Table};
use crate::error::{AppError, ErrorKind};

/// Line-format options for `read_table`.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Everything from this character to end-of-line is discarded.
    pub comment_char: char,
    pub separator: char,
    pub on_parse_failure: ParseFailurePolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            comment_char: '#',
            separator: ',',
            on_parse_failure: ParseFailurePolicy::ZeroFill,
        }
    }
}

/// A recovered, non-fatal problem on one input line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    /// 1-based line number.
    pub line: usize,
    /// 0-based field index, when the problem is tied to one field.
    pub field: Option<usize>,
    pub message: String,
}

/// Ingest output: the dense table plus what happened along the way.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub table: Table,
    pub warnings: Vec<ParseWarning>,
    pub lines_read: usize,
    pub rows_used: usize,
}

/// Read `tuple_size`-wide numeric tuples from `path`.
///
/// Blank and comment-only lines produce no row. Missing trailing fields are
/// zero; extra fields are ignored. See [`ParseFailurePolicy`] for bad tokens.
pub fn read_table(path: &Path, tuple_size: usize, options: &IngestOptions) -> Result<IngestedTable, AppError> {
    if tuple_size == 0 {
        return Err(AppError::invalid_argument("Tuple size must be at least 1."));
    }

    let file = File::open(path).map_err(|e| {
        let kind = if e.kind() == std::io::ErrorKind::NotFound {
            ErrorKind::FileNotFound
        } else {
            ErrorKind::Io
        };
        AppError::new(kind, format!("Failed to open input '{}': {e}", path.display()))
    })?;

    read_tuples(BufReader::new(file), tuple_size, options)
}

/// Reader-based core of [`read_table`].
pub fn read_tuples<R: BufRead>(mut reader: R, tuple_size: usize, options: &IngestOptions) -> Result<IngestedTable, AppError> {
    if tuple_size == 0 {
        return Err(AppError::invalid_argument("Tuple size must be at least 1."));
    }

    let mut records: RecordList<Vec<f64>> = RecordList::new();
    let mut warnings = Vec::new();
    let mut lines_read = 0usize;

    let mut raw = Vec::new();
    let mut comment_buf = [0u8; 4];
    let comment = options.comment_char.encode_utf8(&mut comment_buf).as_bytes();

    loop {
        raw.clear();
        let line_no = lines_read + 1;
        let n = reader
            .read_until(b'\n', &mut raw)
            .map_err(|e| AppError::io(format!("Failed to read line {line_no}: {e}")))?;
        if n == 0 {
            break;
        }
        lines_read += 1;

        // Bytes are decoded only after the comment is cut off, so stray
        // non-UTF-8 bytes in comments are harmless. Any left in the data part
        // become U+FFFD and fail as ordinary bad fields.
        let data = strip_comment(trim_line_ending(&raw), comment);
        let line = String::from_utf8_lossy(data);

        // `None` means blank, comment-only, or skipped by policy.
        if let Some(record) = parse_line(&line, line_no, tuple_size, options, &mut warnings)? {
            records.append(record);
        }
    }

    let rows_used = records.len();
    let mut data = Vec::with_capacity(rows_used * tuple_size);
    records.drain_all(|record| data.extend(record));
    let table = Table::from_row_major(rows_used, tuple_size, data)?;

    for w in &warnings {
        match w.field {
            Some(field) => log::warn!("line {} field {}: {}", w.line, field + 1, w.message),
            None => log::warn!("line {}: {}", w.line, w.message),
        }
    }
    log::debug!("ingested {rows_used} rows of {tuple_size} from {lines_read} lines");

    Ok(IngestedTable {
        table,
        warnings,
        lines_read,
        rows_used,
    })
}

fn parse_line(
    line: &str,
    line_no: usize,
    tuple_size: usize,
    options: &IngestOptions,
    warnings: &mut Vec<ParseWarning>,
) -> Result<Option<Vec<f64>>, AppError> {
    let content = line.trim();
    if content.is_empty() {
        return Ok(None);
    }

    let mut record = vec![0.0; tuple_size];
    let mut present = 0usize;

    for (field, token) in content.split(options.separator).take(tuple_size).enumerate() {
        present += 1;
        let token = token.trim();
        match parse_field(token) {
            Ok(v) => record[field] = v,
            Err(message) => match options.on_parse_failure {
                ParseFailurePolicy::ZeroFill => warnings.push(ParseWarning {
                    line: line_no,
                    field: Some(field),
                    message: format!("{message}; using 0"),
                }),
                ParseFailurePolicy::SkipRow => {
                    warnings.push(ParseWarning {
                        line: line_no,
                        field: Some(field),
                        message: format!("{message}; row skipped"),
                    });
                    return Ok(None);
                }
                ParseFailurePolicy::Abort => {
                    return Err(AppError::new(
                        ErrorKind::Parse,
                        format!("Line {line_no}, field {}: {message}", field + 1),
                    ));
                }
            },
        }
    }

    if present < tuple_size {
        warnings.push(ParseWarning {
            line: line_no,
            field: None,
            message: format!("expected {tuple_size} fields, found {present}; missing fields are 0"),
        });
    }

    Ok(Some(record))
}

fn trim_line_ending(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}

fn strip_comment<'a>(line: &'a [u8], comment: &[u8]) -> &'a [u8] {
    match line.windows(comment.len()).position(|w| w == comment) {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_field(token: &str) -> Result<f64, String> {
    if token.is_empty() {
        return Err("empty field".to_string());
    }
    let v = token
        .parse::<f64>()
        .map_err(|_| format!("invalid number '{token}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("non-finite number '{token}'"))
    }
}
