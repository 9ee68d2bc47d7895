//src/sheet.rs
use crate::record::{CellValue, RawRow, COLUMNS};
use crate::store::{StoreError, WorkoutStore};
use csv::{ByteRecord, ReaderBuilder, StringRecord, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};

/// Rows above the first workout row.
pub const HEADER_ROWS: usize = 1;

/// 1-based spreadsheet row number holding the workout at `position`.
pub const fn sheet_row_number(position: usize) -> usize {
    position + HEADER_ROWS + 1
}

/// A spreadsheet kept as a CSV file: one header row, then one row per workout.
#[derive(Debug, Clone)]
pub struct CsvSheet {
    path: PathBuf,
}

struct SheetContents {
    header: StringRecord,
    rows: Vec<StringRecord>,
}

impl SheetContents {
    fn blank() -> Self {
        Self {
            header: StringRecord::from(COLUMNS.to_vec()),
            rows: Vec::new(),
        }
    }

    /// Adds a header column for every cell of `row` the sheet has no column for.
    fn extend_header(&mut self, row: &RawRow) {
        for column in row.columns() {
            if !self.header.iter().any(|h| h.eq_ignore_ascii_case(column)) {
                log::info!("Adding missing '{column}' column to the sheet header");
                self.header.push_field(column);
            }
        }
    }
}

/// Decodes a sheet row, replacing invalid UTF-8 so one bad cell can't hide the sheet.
fn decode_lossy(record: ByteRecord, sheet_row: usize) -> StringRecord {
    if std::str::from_utf8(record.as_slice()).is_err() {
        log::warn!("Sheet row {sheet_row} holds invalid UTF-8; replacing the bad bytes");
    }
    StringRecord::from_byte_record_lossy(record)
}

impl CsvSheet {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SheetContents, csv::Error> {
        if !self.path.exists() {
            // Nothing logged yet; the file appears on the first append
            return Ok(SheetContents::blank());
        }
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(&self.path)?;
        let mut header = decode_lossy(reader.byte_headers()?.clone(), 1);
        if header.iter().all(|column| column.trim().is_empty()) {
            log::info!(
                "Sheet {} has no header row; using the default columns",
                self.path.display()
            );
            header = StringRecord::from(COLUMNS.to_vec());
        }
        let rows = reader
            .byte_records()
            .enumerate()
            .map(|(idx, record)| record.map(|r| decode_lossy(r, sheet_row_number(idx))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SheetContents { header, rows })
    }

    /// Rewrites the whole sheet through a sibling temp file so a failed write
    /// leaves the previous contents in place.
    fn write(&self, contents: &SheetContents) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(StoreError::write_failed)?;
        }
        let tmp_path = self.path.with_extension("csv.tmp");
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .from_path(&tmp_path)
            .map_err(StoreError::write_failed)?;
        writer
            .write_record(&contents.header)
            .map_err(StoreError::write_failed)?;
        for row in &contents.rows {
            writer.write_record(row).map_err(StoreError::write_failed)?;
        }
        writer.flush().map_err(StoreError::write_failed)?;
        drop(writer);
        fs::rename(&tmp_path, &self.path).map_err(StoreError::write_failed)
    }
}

fn to_raw_row(header: &StringRecord, record: &StringRecord) -> RawRow {
    header
        .iter()
        .enumerate()
        .fold(RawRow::new(), |row, (idx, column)| {
            row.with(column, CellValue::from_text(record.get(idx).unwrap_or_default()))
        })
}

fn to_string_record(header: &StringRecord, row: &RawRow) -> StringRecord {
    header
        .iter()
        .map(|column| row.get(column).map(ToString::to_string).unwrap_or_default())
        .collect()
}

impl WorkoutStore for CsvSheet {
    fn fetch_all(&self) -> Result<Vec<RawRow>, StoreError> {
        let contents = self.read().map_err(StoreError::unavailable)?;
        Ok(contents
            .rows
            .iter()
            .map(|record| to_raw_row(&contents.header, record))
            .collect())
    }

    fn append(&mut self, row: &RawRow) -> Result<(), StoreError> {
        let mut contents = self.read().map_err(StoreError::write_failed)?;
        contents.extend_header(row);
        let record = to_string_record(&contents.header, row);
        contents.rows.push(record);
        self.write(&contents)?;
        log::info!(
            "Appended workout as sheet row {} in {}",
            sheet_row_number(contents.rows.len() - 1),
            self.path.display()
        );
        Ok(())
    }

    fn delete_at(&mut self, position: usize) -> Result<(), StoreError> {
        let mut contents = self.read().map_err(StoreError::write_failed)?;
        if position >= contents.rows.len() {
            return Err(StoreError::RowNotFound {
                position,
                len: contents.rows.len(),
            });
        }
        contents.rows.remove(position);
        self.write(&contents)?;
        log::info!(
            "Deleted sheet row {} from {}",
            sheet_row_number(position),
            self.path.display()
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
