use std::collections::BTreeSet;

use log::debug;

use crate::error::{InfParquetError, Result};
use crate::metadata::{CompressedChunk, MetadataDocument, RowGroupInfo};
use crate::value::Scalar;

use super::parser::{CompareOp, Query, QueryPredicate};
use super::result::{summary, ColumnRef, QueryResult, RowGroupRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileField {
    SourceName,
    SourceSize,
    CompressedSize,
    CompressionRatio,
    NumRows,
    NumRowGroups,
    NumColumns,
    FormatVersion,
    Codec,
    CodecLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowGroupField {
    Index,
    NumRows,
    ByteSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnField {
    Name,
    Type,
    Index,
    Min,
    Max,
    NullCount,
    OriginalLength,
    CompressedLength,
    CompressionRatio,
}

/// An attribute bound to its source in the document
#[derive(Debug, Clone, PartialEq)]
enum Attribute {
    File(FileField),
    Custom(Scalar),
    RowGroup(RowGroupField),
    Column(ColumnField),
}

/// Granularity an expression must be evaluated at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Scope {
    File,
    RowGroup,
    Column,
}

impl Attribute {
    fn scope(&self) -> Scope {
        match self {
            Attribute::File(_) | Attribute::Custom(_) => Scope::File,
            Attribute::RowGroup(_) => Scope::RowGroup,
            Attribute::Column(_) => Scope::Column,
        }
    }
}

enum Bound<'q> {
    Compare {
        attribute: Attribute,
        op: CompareOp,
        literal: &'q Scalar,
    },
    And(Box<Bound<'q>>, Box<Bound<'q>>),
    Or(Box<Bound<'q>>, Box<Bound<'q>>),
    Not(Box<Bound<'q>>),
}

impl Bound<'_> {
    fn scope(&self) -> Scope {
        match self {
            Bound::Compare { attribute, .. } => attribute.scope(),
            Bound::And(l, r) | Bound::Or(l, r) => l.scope().max(r.scope()),
            Bound::Not(inner) => inner.scope(),
        }
    }
}

fn builtin(name: &str) -> Option<Attribute> {
    let lower = name.to_ascii_lowercase();
    let attribute = match lower.as_str() {
        "source_name" => Attribute::File(FileField::SourceName),
        "source_size" => Attribute::File(FileField::SourceSize),
        "compressed_size" => Attribute::File(FileField::CompressedSize),
        "compression_ratio" => Attribute::File(FileField::CompressionRatio),
        "num_rows" => Attribute::File(FileField::NumRows),
        "num_row_groups" => Attribute::File(FileField::NumRowGroups),
        "num_columns" => Attribute::File(FileField::NumColumns),
        "format_version" => Attribute::File(FileField::FormatVersion),
        "codec" => Attribute::File(FileField::Codec),
        "codec_level" => Attribute::File(FileField::CodecLevel),
        "row_group.index" => Attribute::RowGroup(RowGroupField::Index),
        "row_group.num_rows" => Attribute::RowGroup(RowGroupField::NumRows),
        "row_group.byte_size" => Attribute::RowGroup(RowGroupField::ByteSize),
        "column.name" => Attribute::Column(ColumnField::Name),
        "column.type" => Attribute::Column(ColumnField::Type),
        "column.index" => Attribute::Column(ColumnField::Index),
        "column.min" => Attribute::Column(ColumnField::Min),
        "column.max" => Attribute::Column(ColumnField::Max),
        "column.null_count" => Attribute::Column(ColumnField::NullCount),
        "column.original_length" => Attribute::Column(ColumnField::OriginalLength),
        "column.compressed_length" => Attribute::Column(ColumnField::CompressedLength),
        "column.compression_ratio" => Attribute::Column(ColumnField::CompressionRatio),
        _ => return None,
    };
    Some(attribute)
}

/// Resolve every attribute up front so unknown names fail before evaluation
fn bind<'q>(predicate: &'q QueryPredicate, document: &MetadataDocument) -> Result<Bound<'q>> {
    Ok(match predicate {
        QueryPredicate::Compare {
            attribute,
            op,
            literal,
        } => {
            let resolved = match builtin(attribute) {
                Some(a) => a,
                None => match document.custom(attribute) {
                    Some(item) => {
                        Attribute::Custom(item.value.as_scalar().cloned().unwrap_or(Scalar::Null))
                    }
                    None => {
                        return Err(InfParquetError::InvalidQuery(format!(
                            "unknown attribute '{}'",
                            attribute
                        )))
                    }
                },
            };
            Bound::Compare {
                attribute: resolved,
                op: *op,
                literal,
            }
        }
        QueryPredicate::And(l, r) => Bound::And(
            Box::new(bind(l, document)?),
            Box::new(bind(r, document)?),
        ),
        QueryPredicate::Or(l, r) => Bound::Or(
            Box::new(bind(l, document)?),
            Box::new(bind(r, document)?),
        ),
        QueryPredicate::Not(inner) => Bound::Not(Box::new(bind(inner, document)?)),
    })
}

struct Context<'d> {
    document: &'d MetadataDocument,
    row_group: Option<&'d RowGroupInfo>,
    chunk: Option<&'d CompressedChunk>,
}

fn uint(v: u64) -> Scalar {
    i64::try_from(v).map_or(Scalar::Float(v as f64), Scalar::Int)
}

impl Context<'_> {
    fn value(&self, attribute: &Attribute) -> Scalar {
        let basic = &self.document.basic;
        match attribute {
            Attribute::Custom(value) => value.clone(),
            Attribute::File(field) => match field {
                FileField::SourceName => Scalar::Str(basic.source.name.clone()),
                FileField::SourceSize => uint(basic.source.size),
                FileField::CompressedSize => uint(basic.blob_size),
                FileField::CompressionRatio => Scalar::Float(basic.compression_ratio()),
                FileField::NumRows => basic.num_rows().map_or(Scalar::Null, Scalar::Int),
                FileField::NumRowGroups => uint(basic.num_row_groups as u64),
                FileField::NumColumns => uint(basic.num_columns as u64),
                FileField::FormatVersion => Scalar::Str(basic.format_version.clone()),
                FileField::Codec => Scalar::Str(basic.codec.codec.clone()),
                FileField::CodecLevel => Scalar::Int(i64::from(basic.codec.level)),
            },
            Attribute::RowGroup(field) => {
                let Some(rg) = self.row_group else {
                    return Scalar::Null;
                };
                match field {
                    RowGroupField::Index => uint(rg.index as u64),
                    RowGroupField::NumRows => rg.num_rows.map_or(Scalar::Null, Scalar::Int),
                    RowGroupField::ByteSize => uint(rg.byte_size),
                }
            }
            Attribute::Column(field) => {
                let Some(chunk) = self.chunk else {
                    return Scalar::Null;
                };
                let stat = |pick: fn(&crate::layout::ColumnStatistics) -> Option<Scalar>| {
                    chunk.statistics.as_ref().and_then(pick).unwrap_or(Scalar::Null)
                };
                match field {
                    ColumnField::Name => Scalar::Str(chunk.column_path.clone()),
                    ColumnField::Type => basic
                        .schema
                        .get(chunk.column_index)
                        .map_or(Scalar::Null, |f| Scalar::Str(f.physical_type.clone())),
                    ColumnField::Index => uint(chunk.column_index as u64),
                    ColumnField::Min => stat(|s| s.min.clone()),
                    ColumnField::Max => stat(|s| s.max.clone()),
                    ColumnField::NullCount => stat(|s| s.null_count.map(uint)),
                    ColumnField::OriginalLength => uint(chunk.original_length),
                    ColumnField::CompressedLength => uint(chunk.compressed_length),
                    ColumnField::CompressionRatio => Scalar::Float(chunk.compression_ratio()),
                }
            }
        }
    }

    fn test(&self, bound: &Bound<'_>) -> bool {
        match bound {
            Bound::Compare {
                attribute,
                op,
                literal,
            } => compare(&self.value(attribute), *op, literal),
            Bound::And(l, r) => self.test(l) && self.test(r),
            Bound::Or(l, r) => self.test(l) || self.test(r),
            Bound::Not(inner) => !self.test(inner),
        }
    }
}

/// Incomparable pairs (mismatched types, nulls) never satisfy any operator
fn compare(value: &Scalar, op: CompareOp, literal: &Scalar) -> bool {
    value.compare(literal).map_or(false, |ordering| op.holds(ordering))
}

/// Evaluate a parsed query against one document.
///
/// File-scoped predicates are tested once. Predicates that mention
/// `row_group.*` attributes are tested per row group, and those that mention
/// `column.*` attributes per column chunk; the file matches when any of
/// those contexts does.
pub fn evaluate(document: &MetadataDocument, query: &Query) -> Result<QueryResult> {
    let basic = &document.basic;
    let mut result = QueryResult {
        success: true,
        ..QueryResult::default()
    };

    let Some(predicate) = &query.predicate else {
        result.matching_files.push(basic.source.name.clone());
        result.message = summary(&result);
        return Ok(result);
    };
    let bound = bind(predicate, document)?;

    let file_matches = match bound.scope() {
        Scope::File => Context {
            document,
            row_group: None,
            chunk: None,
        }
        .test(&bound),
        Scope::RowGroup => {
            for rg in &basic.row_groups {
                let ctx = Context {
                    document,
                    row_group: Some(rg),
                    chunk: None,
                };
                if ctx.test(&bound) {
                    result.matching_row_groups.push(RowGroupRef {
                        file: basic.source.name.clone(),
                        row_group_index: rg.index,
                    });
                }
            }
            !result.matching_row_groups.is_empty()
        }
        Scope::Column => {
            let mut groups = BTreeSet::new();
            for chunk in &basic.chunks {
                let ctx = Context {
                    document,
                    row_group: basic.row_groups.get(chunk.row_group_index),
                    chunk: Some(chunk),
                };
                if ctx.test(&bound) {
                    groups.insert(chunk.row_group_index);
                    result.matching_columns.push(ColumnRef {
                        file: basic.source.name.clone(),
                        row_group_index: chunk.row_group_index,
                        column_index: chunk.column_index,
                        column_name: chunk.column_path.clone(),
                    });
                }
            }
            result.matching_row_groups = groups
                .into_iter()
                .map(|row_group_index| RowGroupRef {
                    file: basic.source.name.clone(),
                    row_group_index,
                })
                .collect();
            !result.matching_columns.is_empty()
        }
    };

    if file_matches {
        result.matching_files.push(basic.source.name.clone());
    }
    result.message = summary(&result);
    debug!("Query '{}' on {}: {}", predicate, basic.source.name, result.message);
    Ok(result)
}
