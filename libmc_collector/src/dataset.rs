use arrow::array::{Array, ArrayRef, AsArray, Float64Array, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use super::error::DatasetError;
use super::record::{AngleBin, Category, EnergyBin, ScoreRecord};

const SPECIES_COLUMN: &str = "secondary";
const PRIMARY_ENERGY_COLUMN: &str = "primary_energy";
const ANGLE_LOW_COLUMN: &str = "angle_lower_deg";
const ANGLE_HIGH_COLUMN: &str = "angle_upper_deg";
const ENERGY_LOW_COLUMN: &str = "E_low";
const ENERGY_HIGH_COLUMN: &str = "E_high";
const SAMPLES_COLUMN: &str = "n_cycles";

/// A sorted table of score records of one extraction category.
///
/// Rows are ordered by (species, primary energy, angle bin, energy bin). Keys are not required
/// to be unique; repeated keys (e.g. two detectors scoring the same bin) are kept adjacent.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    category: Category,
    rows: Vec<ScoreRecord>,
}

impl Dataset {
    /// Build a dataset from records. Records of other categories are dropped.
    pub fn assemble(category: Category, records: Vec<ScoreRecord>) -> Self {
        let mut rows: Vec<ScoreRecord> = records
            .into_iter()
            .filter(|r| r.category == category)
            .collect();
        rows.sort_by_cached_key(|r| r.key());
        Self { category, rows }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn rows(&self) -> &[ScoreRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct secondaries observed, for diagnostics
    pub fn species(&self) -> BTreeSet<String> {
        self.rows.iter().map(|r| r.species.clone()).collect()
    }

    /// Distinct primary energies observed, ascending, for diagnostics
    pub fn primary_energies(&self) -> Vec<f64> {
        let mut energies: Vec<f64> = self.rows.iter().map(|r| r.primary_energy).collect();
        energies.sort_by(|a, b| a.total_cmp(b));
        energies.dedup();
        energies
    }

    /// Number of rows whose key equals the key of the preceding row
    pub fn duplicate_keys(&self) -> usize {
        self.rows
            .windows(2)
            .filter(|w| w[0].key() == w[1].key())
            .count()
    }

    fn schema(&self) -> Schema {
        let mut fields = vec![
            Field::new(SPECIES_COLUMN, DataType::Utf8, false),
            Field::new(PRIMARY_ENERGY_COLUMN, DataType::Float64, false),
        ];
        if self.category.has_angle_bins() {
            fields.push(Field::new(ANGLE_LOW_COLUMN, DataType::Float64, true));
            fields.push(Field::new(ANGLE_HIGH_COLUMN, DataType::Float64, true));
        }
        if self.category.has_energy_bins() {
            fields.push(Field::new(ENERGY_LOW_COLUMN, DataType::Float64, true));
            fields.push(Field::new(ENERGY_HIGH_COLUMN, DataType::Float64, true));
        }
        fields.push(Field::new(self.category.value_column(), DataType::Float64, false));
        fields.push(Field::new(self.category.error_column(), DataType::Float64, true));
        if self.category == Category::CycleAveraged {
            fields.push(Field::new(SAMPLES_COLUMN, DataType::UInt32, false));
        }
        Schema::new(fields)
    }

    fn to_record_batch(&self) -> Result<RecordBatch, DatasetError> {
        let schema = Arc::new(self.schema());
        let rows = self.rows.as_slice();

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(
                self.rows
                    .iter()
                    .map(|r| Some(r.species.as_str()))
                    .collect::<StringArray>(),
            ),
            float_column(rows, |r| Some(r.primary_energy)),
        ];
        // Declared key columns are always present; missing bins become nulls
        if self.category.has_angle_bins() {
            columns.push(float_column(rows, |r| r.angle.map(|a| a.low)));
            columns.push(float_column(rows, |r| r.angle.map(|a| a.high)));
        }
        if self.category.has_energy_bins() {
            columns.push(float_column(rows, |r| r.energy.map(|e| e.low)));
            columns.push(float_column(rows, |r| r.energy.map(|e| e.high)));
        }
        columns.push(float_column(rows, |r| Some(r.value)));
        columns.push(float_column(rows, |r| r.rel_error));
        if self.category == Category::CycleAveraged {
            columns.push(Arc::new(
                self.rows
                    .iter()
                    .map(|r| Some(r.samples.unwrap_or(1)))
                    .collect::<UInt32Array>(),
            ));
        }

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Write the dataset to a Parquet file, replacing any existing file
    pub fn write_parquet(&self, path: &Path) -> Result<(), DatasetError> {
        let batch = self.to_record_batch()?;
        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }

    /// Read a dataset of a known category back from Parquet.
    ///
    /// Bin columns that are absent from the file are read as missing bins.
    pub fn read_parquet(path: &Path, category: Category) -> Result<Self, DatasetError> {
        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut rows = Vec::new();
        for batch_result in reader {
            let batch = batch_result?;
            let species = string_column(&batch, SPECIES_COLUMN)?;
            let primary_energy = required_f64(&batch, PRIMARY_ENERGY_COLUMN)?;
            let value = required_f64(&batch, category.value_column())?;
            let rel_error = optional_f64(&batch, category.error_column())?;
            let angle_low = optional_f64(&batch, ANGLE_LOW_COLUMN)?;
            let angle_high = optional_f64(&batch, ANGLE_HIGH_COLUMN)?;
            let energy_low = optional_f64(&batch, ENERGY_LOW_COLUMN)?;
            let energy_high = optional_f64(&batch, ENERGY_HIGH_COLUMN)?;
            let samples = match batch.column_by_name(SAMPLES_COLUMN) {
                Some(col) => Some(
                    col.as_any()
                        .downcast_ref::<UInt32Array>()
                        .ok_or_else(|| DatasetError::BadColumnType(SAMPLES_COLUMN.to_string()))?,
                ),
                None => None,
            };

            for row in 0..batch.num_rows() {
                let pair = |lo: Option<&Float64Array>, hi: Option<&Float64Array>| {
                    match (value_at(lo, row), value_at(hi, row)) {
                        (Some(low), Some(high)) => Some((low, high)),
                        _ => None,
                    }
                };
                rows.push(ScoreRecord {
                    species: species[row].clone(),
                    primary_energy: primary_energy.value(row),
                    energy: pair(energy_low, energy_high).map(|(low, high)| EnergyBin { low, high }),
                    angle: pair(angle_low, angle_high).map(|(low, high)| AngleBin { low, high }),
                    value: value.value(row),
                    rel_error: value_at(rel_error, row),
                    samples: samples.and_then(|s| (!s.is_null(row)).then(|| s.value(row))),
                    category,
                });
            }
        }

        Ok(Self::assemble(category, rows))
    }
}

fn float_column(rows: &[ScoreRecord], f: impl Fn(&ScoreRecord) -> Option<f64>) -> ArrayRef {
    Arc::new(rows.iter().map(f).collect::<Float64Array>())
}

fn value_at(col: Option<&Float64Array>, row: usize) -> Option<f64> {
    col.and_then(|c| (!c.is_null(row)).then(|| c.value(row)))
}

fn optional_f64<'a>(batch: &'a RecordBatch, name: &str) -> Result<Option<&'a Float64Array>, DatasetError> {
    match batch.column_by_name(name) {
        Some(col) => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(Some)
            .ok_or_else(|| DatasetError::BadColumnType(name.to_string())),
        None => Ok(None),
    }
}

fn required_f64<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array, DatasetError> {
    optional_f64(batch, name)?.ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
}

/// Strings may come back as Utf8 or LargeUtf8 depending on the writer
fn string_column(batch: &RecordBatch, name: &str) -> Result<Vec<String>, DatasetError> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))?;
    let values: Vec<Option<&str>> = match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().iter().collect(),
        DataType::LargeUtf8 => col.as_string::<i64>().iter().collect(),
        _ => return Err(DatasetError::BadColumnType(name.to_string())),
    };
    values
        .into_iter()
        .map(|v| {
            v.map(String::from)
                .ok_or_else(|| DatasetError::BadColumnType(name.to_string()))
        })
        .collect()
}
