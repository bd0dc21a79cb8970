//! Tabular input and output for transaction records.
//!
//! A [`Dataset`] keeps every input column. The modeled columns are parsed into
//! [`Transaction`] fields; all other cells are carried through untouched and
//! written back in their original position.

use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use csv::StringRecord;
use thiserror::Error;
use time::{
    format_description::BorrowedFormatItem, macros::format_description, Date, Duration, Month,
};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

/// Sale dates as they appear in the snapshot, e.g. `3/12/2016`.
pub static SALE_DATE_FMT: &[BorrowedFormatItem] =
    format_description!("[day padding:none]/[month padding:none]/[year]");

pub const SUBURB: &str = "Suburb";
pub const PRICE: &str = "Price";
pub const LANDSIZE: &str = "Landsize";
pub const BUILDING_AREA: &str = "BuildingArea";
pub const ROOMS: &str = "Rooms";
pub const TYPE: &str = "Type";
pub const DATE: &str = "Date";
pub const CAR: &str = "Car";
pub const DISTANCE: &str = "Distance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyType {
    House,
    Unit,
    Townhouse,
}

impl PropertyType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "h" | "H" => Some(Self::House),
            "u" | "U" => Some(Self::Unit),
            "t" | "T" => Some(Self::Townhouse),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::House => "h",
            Self::Unit => "u",
            Self::Townhouse => "t",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::House => "House",
            Self::Unit => "Unit",
            Self::Townhouse => "Townhouse",
        }
    }
}

/// One property sale.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub suburb: String,
    pub price: f64,
    pub landsize: f64,
    pub building_area: Option<f64>,
    pub rooms: u32,
    pub property_type: PropertyType,
    pub sale_date: Date,
    /// Absent in the raw snapshot for some rows; always set after cleaning.
    pub car: Option<u32>,
    pub distance: Option<f64>,
    cells: Vec<String>,
}

/// Why a row was dropped while loading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("{0} is empty")]
    Missing(&'static str),

    #[error("{column} has invalid value {value:?}")]
    Invalid { column: &'static str, value: String },
}

/// Positions of the modeled columns within a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub suburb: usize,
    pub price: usize,
    pub landsize: usize,
    pub building_area: usize,
    pub rooms: usize,
    pub property_type: usize,
    pub date: usize,
    pub car: usize,
    pub distance: Option<usize>,
}

impl Columns {
    pub fn locate(headers: &[String]) -> Result<Self> {
        let mut suburb = None;
        let mut price = None;
        let mut landsize = None;
        let mut building_area = None;
        let mut rooms = None;
        let mut property_type = None;
        let mut date = None;
        let mut car = None;
        let mut distance = None;
        for (pos, h) in headers.iter().enumerate() {
            let slot = match h.trim() {
                SUBURB => &mut suburb,
                PRICE => &mut price,
                LANDSIZE => &mut landsize,
                BUILDING_AREA => &mut building_area,
                ROOMS => &mut rooms,
                TYPE => &mut property_type,
                DATE => &mut date,
                CAR => &mut car,
                DISTANCE => &mut distance,
                _ => continue,
            };
            // First occurrence wins on duplicate headers.
            slot.get_or_insert(pos);
        }
        let required = |idx: Option<usize>, name: &str| {
            idx.ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            suburb: required(suburb, SUBURB)?,
            price: required(price, PRICE)?,
            landsize: required(landsize, LANDSIZE)?,
            building_area: required(building_area, BUILDING_AREA)?,
            rooms: required(rooms, ROOMS)?,
            property_type: required(property_type, TYPE)?,
            date: required(date, DATE)?,
            car: required(car, CAR)?,
            distance,
        })
    }

    /// Parse one data row. `cells` must be in header order.
    pub fn parse_row(
        &self,
        cells: Vec<String>,
        width: usize,
    ) -> std::result::Result<Transaction, RowError> {
        if cells.len() != width {
            return Err(RowError::FieldCount {
                expected: width,
                found: cells.len(),
            });
        }
        let suburb = cells[self.suburb].trim().to_string();
        if suburb.is_empty() {
            return Err(RowError::Missing(SUBURB));
        }
        let price = parse_f64(&cells[self.price], PRICE)?.ok_or(RowError::Missing(PRICE))?;
        if price <= 0.0 {
            return Err(invalid(PRICE, &cells[self.price]));
        }
        let landsize =
            parse_f64(&cells[self.landsize], LANDSIZE)?.ok_or(RowError::Missing(LANDSIZE))?;
        let rooms = parse_count(&cells[self.rooms], ROOMS)?.ok_or(RowError::Missing(ROOMS))?;
        let property_type = PropertyType::from_code(&cells[self.property_type])
            .ok_or_else(|| invalid(TYPE, &cells[self.property_type]))?;
        let date_cell = cells[self.date].trim();
        if date_cell.is_empty() {
            return Err(RowError::Missing(DATE));
        }
        let sale_date =
            Date::parse(date_cell, &SALE_DATE_FMT).map_err(|_| invalid(DATE, date_cell))?;
        let building_area = parse_f64(&cells[self.building_area], BUILDING_AREA)?;
        let car = parse_count(&cells[self.car], CAR)?;
        let distance = match self.distance {
            Some(idx) => parse_f64(&cells[idx], DISTANCE)?,
            None => None,
        };
        Ok(Transaction {
            suburb,
            price,
            landsize,
            building_area,
            rooms,
            property_type,
            sale_date,
            car,
            distance,
            cells,
        })
    }
}

fn invalid(column: &'static str, value: &str) -> RowError {
    RowError::Invalid {
        column,
        value: value.to_string(),
    }
}

/// Empty cells are `None`; anything else must be a finite number.
fn parse_f64(cell: &str, column: &'static str) -> std::result::Result<Option<f64>, RowError> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(invalid(column, cell)),
    }
}

/// Counts may be written as `3` or `3.0`.
fn parse_count(cell: &str, column: &'static str) -> std::result::Result<Option<u32>, RowError> {
    match parse_f64(cell, column)? {
        None => Ok(None),
        Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(Some(v as u32)),
        Some(_) => Err(invalid(column, cell.trim())),
    }
}

impl Transaction {
    /// Output cells in header order, with modeled columns rendered from the
    /// typed fields.
    pub fn cells(&self, columns: &Columns) -> Result<Vec<String>> {
        let mut out = self.cells.clone();
        out[columns.suburb] = self.suburb.clone();
        out[columns.price] = self.price.to_string();
        out[columns.landsize] = self.landsize.to_string();
        out[columns.building_area] = self
            .building_area
            .map(|v| v.to_string())
            .unwrap_or_default();
        out[columns.rooms] = self.rooms.to_string();
        out[columns.property_type] = self.property_type.code().to_string();
        out[columns.date] = self.sale_date.format(SALE_DATE_FMT)?;
        out[columns.car] = self.car.map(|v| v.to_string()).unwrap_or_default();
        if let Some(idx) = columns.distance {
            out[idx] = self.distance.map(|v| v.to_string()).unwrap_or_default();
        }
        Ok(out)
    }
}

/// Header and rows exactly as read, before any parsing.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Rows that could not be decoded as UTF-8 and were skipped on read.
    pub undecodable_rows: usize,
}

impl RawTable {
    /// Read a CSV file, or the first worksheet of an `.xlsx` workbook.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_xlsx = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("xlsx"))
            .unwrap_or(false);
        let table = if is_xlsx {
            Self::read_xlsx(path)?
        } else {
            Self::read_csv(path)?
        };
        debug!(
            "Read {} rows x {} columns from {}",
            table.rows.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    fn read_csv(path: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        let mut undecodable_rows = 0;
        for record in rdr.byte_records() {
            let record = record?;
            let line = record.position().map(|p| p.line());
            match StringRecord::from_byte_record(record) {
                Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
                Err(err) => {
                    warn!(
                        row = line,
                        "Dropping malformed row: field {} is not valid UTF-8",
                        err.utf8_error().field() + 1
                    );
                    undecodable_rows += 1;
                }
            }
        }
        Ok(Self {
            headers,
            rows,
            undecodable_rows,
        })
    }

    fn read_xlsx(path: &Path) -> Result<Self> {
        let mut spreadsheet: Xlsx<_> = open_workbook(path)?;
        let range = spreadsheet
            .worksheet_range_at(0)
            .ok_or_else(|| PipelineError::EmptyWorkbook(path.to_path_buf()))??;
        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .map(|r| r.iter().map(|c| workbook_cell(c).trim().to_string()).collect())
            .unwrap_or_default();
        let rows: Vec<Vec<String>> = rows.map(|r| r.iter().map(workbook_cell).collect()).collect();
        Ok(Self {
            headers,
            rows,
            undecodable_rows: 0,
        })
    }

    /// Percentage of non-empty cells.
    pub fn completeness_pct(&self) -> f64 {
        completeness_pct(self.rows.iter().map(Vec::as_slice), self.headers.len())
    }

    /// Drop the named columns (header and cells).
    pub fn without_columns(self, names: &[&str]) -> Self {
        let keep: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !names.contains(&h.as_str()))
            .map(|(pos, _)| pos)
            .collect();
        if keep.len() == self.headers.len() {
            return self;
        }
        let project = |row: &[String]| -> Vec<String> {
            keep.iter().filter_map(|&i| row.get(i).cloned()).collect()
        };
        Self {
            headers: project(&self.headers),
            rows: self.rows.iter().map(|r| project(r)).collect(),
            undecodable_rows: self.undecodable_rows,
        }
    }
}

fn workbook_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .and_then(|d| d.format(SALE_DATE_FMT).ok())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

/// Excel serial day numbers count from 1899-12-30.
fn excel_serial_to_date(serial: f64) -> Option<Date> {
    let epoch = Date::from_calendar_date(1899, Month::December, 30).ok()?;
    epoch.checked_add(Duration::days(serial.floor() as i64))
}

pub(crate) fn completeness_pct<'a>(rows: impl Iterator<Item = &'a [String]>, width: usize) -> f64 {
    let (filled, total) = rows.fold((0usize, 0usize), |(filled, total), row| {
        let present = row.iter().filter(|c| !c.trim().is_empty()).count();
        (filled + present, total + width)
    });
    if total == 0 {
        return 0.0;
    }
    filled as f64 / total as f64 * 100.0
}

/// Parsed records plus the header they were read with.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub columns: Columns,
    pub transactions: Vec<Transaction>,
}

impl Dataset {
    /// Parse every row of `raw`, dropping malformed rows with a warning.
    ///
    /// Returns the dataset and the number of rows dropped, counting rows the
    /// reader could not decode. Fails only when a required column is missing.
    pub fn from_raw(raw: RawTable) -> Result<(Self, usize)> {
        let columns = Columns::locate(&raw.headers)?;
        let width = raw.headers.len();
        let mut transactions = Vec::with_capacity(raw.rows.len());
        let mut malformed = raw.undecodable_rows;
        for (i, cells) in raw.rows.into_iter().enumerate() {
            match columns.parse_row(cells, width) {
                Ok(t) => transactions.push(t),
                Err(reason) => {
                    // +2: one for the header, one for 1-based numbering.
                    warn!(row = i + 2, "Dropping malformed row: {}", reason);
                    malformed += 1;
                }
            }
        }
        Ok((
            Self {
                headers: raw.headers,
                columns,
                transactions,
            },
            malformed,
        ))
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Same header and columns, different rows.
    pub fn with_transactions(&self, transactions: Vec<Transaction>) -> Self {
        Self {
            headers: self.headers.clone(),
            columns: self.columns,
            transactions,
        }
    }

    pub fn completeness_pct(&self) -> Result<f64> {
        let rows = self
            .transactions
            .iter()
            .map(|t| t.cells(&self.columns))
            .collect::<Result<Vec<_>>>()?;
        Ok(completeness_pct(rows.iter().map(Vec::as_slice), self.headers.len()))
    }

    pub fn write_csv<P: AsRef<Path>>(&self, file_path: P) -> Result<()> {
        self.write_csv_with(file_path, &[], |_, _| Ok(Vec::new()))
    }

    /// Write the dataset with extra trailing columns produced per row by
    /// `extra(row_index, transaction)`.
    pub fn write_csv_with<P, F>(
        &self,
        file_path: P,
        extra_headers: &[&str],
        mut extra: F,
    ) -> Result<()>
    where
        P: AsRef<Path>,
        F: FnMut(usize, &Transaction) -> Result<Vec<String>>,
    {
        let mut wtr = csv::Writer::from_path(ensure_parent(file_path.as_ref())?)?;
        wtr.write_record(
            self.headers
                .iter()
                .map(String::as_str)
                .chain(extra_headers.iter().copied()),
        )?;
        for (i, t) in self.transactions.iter().enumerate() {
            let mut row = t.cells(&self.columns)?;
            row.extend(extra(i, t)?);
            wtr.write_record(&row)?;
        }
        wtr.flush().map_err(|e| PipelineError::io(file_path.as_ref(), e))?;
        Ok(())
    }
}

/// Create the parent directory of `path` if needed.
pub(crate) fn ensure_parent(path: &Path) -> Result<&Path> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    Ok(path)
}
