use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, Schema,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use log::debug;

use crate::error::{InfParquetError, Result};
use crate::layout::RowBatches;
use crate::query::CompareOp;
use crate::value::{CustomValue, Scalar, Table};

use super::parser::{
    Aggregate, AggregateFn, Condition, DerivationQuery, Selection, MAX_TABLE_ROWS,
};

/// How a column's values behave in comparisons and aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueClass {
    Integer,
    Float,
    Text,
    Boolean,
    Other,
}

fn classify(data_type: &DataType) -> ValueClass {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => ValueClass::Integer,
        DataType::Float32 | DataType::Float64 => ValueClass::Float,
        DataType::Utf8 | DataType::LargeUtf8 => ValueClass::Text,
        DataType::Boolean => ValueClass::Boolean,
        _ => ValueClass::Other,
    }
}

fn uint(v: u64) -> Scalar {
    i64::try_from(v).map_or(Scalar::Float(v as f64), Scalar::Int)
}

/// Value at `row`; unsupported types are rendered as display strings
fn scalar_at(array: &dyn Array, row: usize) -> Scalar {
    if array.is_null(row) {
        return Scalar::Null;
    }
    match array.data_type() {
        DataType::Int8 => Scalar::Int(i64::from(array.as_primitive::<Int8Type>().value(row))),
        DataType::Int16 => Scalar::Int(i64::from(array.as_primitive::<Int16Type>().value(row))),
        DataType::Int32 => Scalar::Int(i64::from(array.as_primitive::<Int32Type>().value(row))),
        DataType::Int64 => Scalar::Int(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Scalar::Int(i64::from(array.as_primitive::<UInt8Type>().value(row))),
        DataType::UInt16 => Scalar::Int(i64::from(array.as_primitive::<UInt16Type>().value(row))),
        DataType::UInt32 => Scalar::Int(i64::from(array.as_primitive::<UInt32Type>().value(row))),
        DataType::UInt64 => uint(array.as_primitive::<UInt64Type>().value(row)),
        DataType::Float32 => {
            Scalar::Float(f64::from(array.as_primitive::<Float32Type>().value(row)))
        }
        DataType::Float64 => Scalar::Float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Scalar::Str(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Scalar::Str(array.as_string::<i64>().value(row).to_string()),
        DataType::Boolean => Scalar::Bool(array.as_boolean().value(row)),
        _ => array_value_to_string(array, row).map_or(Scalar::Null, Scalar::Str),
    }
}

/// Look a column up by exact name, then by unique case-insensitive match
fn resolve_column(schema: &Schema, name: &str) -> Result<(usize, ValueClass)> {
    if let Ok(index) = schema.index_of(name) {
        return Ok((index, classify(schema.field(index).data_type())));
    }
    let mut matches = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| f.name().eq_ignore_ascii_case(name));
    match (matches.next(), matches.next()) {
        (Some((index, field)), None) => Ok((index, classify(field.data_type()))),
        (Some(_), Some(_)) => Err(InfParquetError::InvalidQuery(format!(
            "column name '{}' is ambiguous",
            name
        ))),
        _ => Err(InfParquetError::InvalidQuery(format!(
            "unknown column '{}'",
            name
        ))),
    }
}

fn comparable(class: ValueClass, literal: &Scalar) -> bool {
    matches!(
        (class, literal),
        (ValueClass::Integer | ValueClass::Float, Scalar::Int(_) | Scalar::Float(_))
            | (ValueClass::Text, Scalar::Str(_))
            | (ValueClass::Boolean, Scalar::Bool(_))
    )
}

enum BoundCondition<'q> {
    Compare {
        index: usize,
        op: CompareOp,
        literal: &'q Scalar,
    },
    IsNull {
        index: usize,
        negated: bool,
    },
    And(Box<BoundCondition<'q>>, Box<BoundCondition<'q>>),
    Or(Box<BoundCondition<'q>>, Box<BoundCondition<'q>>),
    Not(Box<BoundCondition<'q>>),
}

fn bind_condition<'q>(condition: &'q Condition, schema: &Schema) -> Result<BoundCondition<'q>> {
    Ok(match condition {
        Condition::Compare {
            column,
            op,
            literal,
        } => {
            let (index, class) = resolve_column(schema, column)?;
            if !comparable(class, literal) {
                return Err(InfParquetError::InvalidQuery(format!(
                    "cannot compare column '{}' of type {} with {}",
                    column,
                    schema.field(index).data_type(),
                    literal
                )));
            }
            BoundCondition::Compare {
                index,
                op: *op,
                literal,
            }
        }
        Condition::IsNull { column, negated } => BoundCondition::IsNull {
            index: resolve_column(schema, column)?.0,
            negated: *negated,
        },
        Condition::And(l, r) => BoundCondition::And(
            Box::new(bind_condition(l, schema)?),
            Box::new(bind_condition(r, schema)?),
        ),
        Condition::Or(l, r) => BoundCondition::Or(
            Box::new(bind_condition(l, schema)?),
            Box::new(bind_condition(r, schema)?),
        ),
        Condition::Not(inner) => BoundCondition::Not(Box::new(bind_condition(inner, schema)?)),
    })
}

impl BoundCondition<'_> {
    /// SQL three-valued test: `None` is unknown (a null operand)
    fn test(&self, batch: &RecordBatch, row: usize) -> Option<bool> {
        match self {
            BoundCondition::Compare { index, op, literal } => {
                let value = scalar_at(batch.column(*index).as_ref(), row);
                value.compare(literal).map(|ordering| op.holds(ordering))
            }
            BoundCondition::IsNull { index, negated } => {
                Some(batch.column(*index).is_null(row) != *negated)
            }
            BoundCondition::And(l, r) => match l.test(batch, row) {
                Some(false) => Some(false),
                left => match (left, r.test(batch, row)) {
                    (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                },
            },
            BoundCondition::Or(l, r) => match l.test(batch, row) {
                Some(true) => Some(true),
                left => match (left, r.test(batch, row)) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                },
            },
            BoundCondition::Not(inner) => inner.test(batch, row).map(|v| !v),
        }
    }
}

/// Running state of one aggregate
struct Accumulator {
    func: AggregateFn,
    index: Option<usize>,
    class: ValueClass,
    count: i64,
    int_sum: Option<i64>,
    float_sum: f64,
    extreme: Option<Scalar>,
}

impl Accumulator {
    fn bind(aggregate: &Aggregate, schema: &Schema) -> Result<Self> {
        let (index, class) = match &aggregate.column {
            Some(column) => {
                let (index, class) = resolve_column(schema, column)?;
                (Some(index), class)
            }
            None => (None, ValueClass::Other),
        };
        let supported = match aggregate.func {
            AggregateFn::Count => true,
            AggregateFn::Sum | AggregateFn::Avg => {
                matches!(class, ValueClass::Integer | ValueClass::Float)
            }
            AggregateFn::Min | AggregateFn::Max => class != ValueClass::Other,
        };
        if !supported {
            return Err(InfParquetError::InvalidQuery(format!(
                "{} is not supported for a column of type {}",
                aggregate,
                index.map_or(DataType::Null, |i| schema.field(i).data_type().clone())
            )));
        }
        Ok(Self {
            func: aggregate.func,
            index,
            class,
            count: 0,
            int_sum: Some(0),
            float_sum: 0.0,
            extreme: None,
        })
    }

    fn update(&mut self, batch: &RecordBatch, row: usize) {
        let Some(index) = self.index else {
            self.count += 1;
            return;
        };
        let column = batch.column(index);
        if column.is_null(row) {
            return;
        }
        self.count += 1;
        match self.func {
            AggregateFn::Count => {}
            AggregateFn::Sum | AggregateFn::Avg => {
                let value = scalar_at(column.as_ref(), row);
                // Integer sums fall back to floating point on overflow
                self.int_sum = match value {
                    Scalar::Int(v) => self.int_sum.and_then(|s| s.checked_add(v)),
                    _ => None,
                };
                self.float_sum += value.as_f64().unwrap_or(0.0);
            }
            AggregateFn::Min | AggregateFn::Max => {
                let value = scalar_at(column.as_ref(), row);
                if matches!(value, Scalar::Float(v) if v.is_nan()) {
                    return;
                }
                let wanted = if self.func == AggregateFn::Min {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Greater
                };
                let replace = match &self.extreme {
                    None => true,
                    Some(current) => value.compare(current) == Some(wanted),
                };
                if replace {
                    self.extreme = Some(value);
                }
            }
        }
    }

    fn finish(self) -> Scalar {
        match self.func {
            AggregateFn::Count => Scalar::Int(self.count),
            _ if self.count == 0 => Scalar::Null,
            AggregateFn::Sum => match (self.class, self.int_sum) {
                (ValueClass::Integer, Some(sum)) => Scalar::Int(sum),
                _ => Scalar::Float(self.float_sum),
            },
            AggregateFn::Avg => Scalar::Float(self.float_sum / self.count as f64),
            AggregateFn::Min | AggregateFn::Max => self.extreme.unwrap_or(Scalar::Null),
        }
    }
}

/// Evaluate a derivation query over the source rows.
///
/// One aggregate yields a scalar, several a one-row table, and a
/// projection a table of at most [`MAX_TABLE_ROWS`] rows. A projection
/// without `LIMIT` that would exceed the cap is rejected.
pub fn evaluate(query: &DerivationQuery, rows: RowBatches) -> Result<CustomValue> {
    let schema = rows.schema.clone();
    let filter = match &query.filter {
        Some(condition) => Some(bind_condition(condition, &schema)?),
        None => None,
    };
    let passes = |batch: &RecordBatch, row: usize| {
        filter
            .as_ref()
            .map_or(true, |f| f.test(batch, row) == Some(true))
    };

    match &query.selection {
        Selection::Aggregates(aggregates) => {
            let mut accumulators = aggregates
                .iter()
                .map(|a| Accumulator::bind(a, &schema))
                .collect::<Result<Vec<_>>>()?;
            let mut scanned = 0usize;
            for batch in rows.batches {
                let batch = batch?;
                scanned += batch.num_rows();
                for row in 0..batch.num_rows() {
                    if passes(&batch, row) {
                        for acc in accumulators.iter_mut() {
                            acc.update(&batch, row);
                        }
                    }
                }
            }
            debug!("Aggregated {} rows for {} aggregates", scanned, aggregates.len());

            let values: Vec<Scalar> = accumulators.into_iter().map(Accumulator::finish).collect();
            if values.len() == 1 {
                Ok(CustomValue::Scalar(values.into_iter().next().unwrap_or(Scalar::Null)))
            } else {
                Ok(CustomValue::Table(Table {
                    columns: aggregates.iter().map(|a| a.to_string()).collect(),
                    rows: vec![values],
                }))
            }
        }
        selection => {
            let columns: Vec<(usize, String)> = match selection {
                Selection::Columns(names) => names
                    .iter()
                    .map(|name| {
                        resolve_column(&schema, name)
                            .map(|(index, _)| (index, schema.field(index).name().clone()))
                    })
                    .collect::<Result<_>>()?,
                _ => schema
                    .fields()
                    .iter()
                    .enumerate()
                    .map(|(i, f)| (i, f.name().clone()))
                    .collect(),
            };
            let cap = query.limit.unwrap_or(MAX_TABLE_ROWS);

            let mut table = Table {
                columns: columns.iter().map(|(_, name)| name.clone()).collect(),
                rows: Vec::new(),
            };
            'batches: for batch in rows.batches {
                let batch = batch?;
                for row in 0..batch.num_rows() {
                    if !passes(&batch, row) {
                        continue;
                    }
                    if table.rows.len() == cap {
                        if query.limit.is_some() {
                            break 'batches;
                        }
                        return Err(InfParquetError::InvalidQuery(format!(
                            "query returns more than {} rows; add a LIMIT or an aggregate",
                            MAX_TABLE_ROWS
                        )));
                    }
                    table.rows.push(
                        columns
                            .iter()
                            .map(|(index, _)| scalar_at(batch.column(*index).as_ref(), row))
                            .collect(),
                    );
                }
            }
            Ok(CustomValue::Table(table))
        }
    }
}
