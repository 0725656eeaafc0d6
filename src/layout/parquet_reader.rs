use bytes::Bytes;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::errors::ParquetError;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::statistics::Statistics;

use crate::error::{InfParquetError, Result};
use crate::value::Scalar;

use super::{
    ColumnChunk, ColumnStatistics, ParquetLayout, RowBatches, RowGroup, SchemaField,
    StructuralReader,
};

/// [`StructuralReader`] backed by the `parquet` crate footer parser
#[derive(Debug, Clone)]
pub struct ParquetStructuralReader {
    batch_size: usize,
}

impl Default for ParquetStructuralReader {
    fn default() -> Self {
        Self { batch_size: 8192 }
    }
}

impl ParquetStructuralReader {
    /// Create a reader with the default record batch size
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows per record batch when streaming row data
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

fn structural(err: ParquetError) -> InfParquetError {
    InfParquetError::StructuralRead(err.to_string())
}

impl StructuralReader for ParquetStructuralReader {
    fn read_layout(&self, source: &Bytes) -> Result<ParquetLayout> {
        let reader = SerializedFileReader::new(source.clone()).map_err(structural)?;
        let metadata = reader.metadata();
        let schema_descr = metadata.file_metadata().schema_descr();

        let schema: Vec<SchemaField> = schema_descr
            .columns()
            .iter()
            .map(|col| SchemaField {
                name: col.path().string(),
                physical_type: col.physical_type().to_string(),
                logical_type: col.logical_type().map(|l| format!("{:?}", l)),
            })
            .collect();

        let mut row_groups = Vec::with_capacity(metadata.num_row_groups());
        for index in 0..metadata.num_row_groups() {
            let rg = metadata.row_group(index);
            let columns: Vec<ColumnChunk> = rg
                .columns()
                .iter()
                .enumerate()
                .map(|(column_index, cc)| {
                    let (offset, length) = cc.byte_range();
                    ColumnChunk {
                        column_index,
                        path: cc.column_path().string(),
                        physical_type: cc.column_type().to_string(),
                        offset,
                        length,
                        statistics: cc.statistics().map(convert_statistics),
                    }
                })
                .collect();
            let byte_size = columns.iter().map(|c| c.length).sum();
            row_groups.push(RowGroup {
                index,
                num_rows: rg.num_rows(),
                byte_size,
                columns,
            });
        }

        let layout = ParquetLayout {
            source_size: source.len() as u64,
            schema,
            row_groups,
        };
        layout.validate()?;

        debug!(
            "Read layout: {} columns, {} row groups, {} bytes",
            layout.num_columns(),
            layout.row_groups.len(),
            layout.source_size
        );
        Ok(layout)
    }

    fn read_batches(&self, source: &Bytes) -> Result<RowBatches> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(source.clone())
            .map_err(structural)?
            .with_batch_size(self.batch_size);
        let schema = builder.schema().clone();
        let reader = builder.build().map_err(structural)?;
        Ok(RowBatches {
            schema,
            batches: Box::new(reader.map(|batch| {
                batch.map_err(|e| InfParquetError::StructuralRead(e.to_string()))
            })),
        })
    }
}

/// Convert footer statistics to typed min/max. Binary values that are not
/// valid UTF-8 and fixed-width/INT96 types keep only the null count.
fn convert_statistics(stats: &Statistics) -> ColumnStatistics {
    let (min, max) = match stats {
        Statistics::Boolean(s) => (
            s.min_opt().map(|v| Scalar::Bool(*v)),
            s.max_opt().map(|v| Scalar::Bool(*v)),
        ),
        Statistics::Int32(s) => (
            s.min_opt().map(|v| Scalar::Int(*v as i64)),
            s.max_opt().map(|v| Scalar::Int(*v as i64)),
        ),
        Statistics::Int64(s) => (
            s.min_opt().map(|v| Scalar::Int(*v)),
            s.max_opt().map(|v| Scalar::Int(*v)),
        ),
        Statistics::Float(s) => (
            s.min_opt().map(|v| Scalar::from(f64::from(*v))),
            s.max_opt().map(|v| Scalar::from(f64::from(*v))),
        ),
        Statistics::Double(s) => (
            s.min_opt().map(|v| Scalar::from(*v)),
            s.max_opt().map(|v| Scalar::from(*v)),
        ),
        Statistics::ByteArray(s) => (
            s.min_opt()
                .and_then(|v| v.as_utf8().ok())
                .map(|v| Scalar::Str(v.to_string())),
            s.max_opt()
                .and_then(|v| v.as_utf8().ok())
                .map(|v| Scalar::Str(v.to_string())),
        ),
        Statistics::Int96(_) | Statistics::FixedLenByteArray(_) => (None, None),
    };

    ColumnStatistics {
        min,
        max,
        null_count: stats.null_count_opt(),
    }
}
