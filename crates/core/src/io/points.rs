//! Occurrence CSV files
//!
//! The location columns are found by name (`longitude`/`lon`/`x` and
//! `latitude`/`lat`/`y`, case-insensitive); every other column becomes an
//! attribute of the occurrence.

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Occurrence, PointSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const X_COLUMNS: [&str; 3] = ["longitude", "lon", "x"];
const Y_COLUMNS: [&str; 3] = ["latitude", "lat", "y"];

pub fn read_points<P: AsRef<Path>>(path: P) -> Result<PointSet> {
    read_points_from_reader(File::open(path.as_ref())?)
}

pub fn read_points_from_reader<R: Read>(reader: R) -> Result<PointSet> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let find = |candidates: &[&str]| {
        headers
            .iter()
            .position(|h| candidates.iter().any(|c| h.eq_ignore_ascii_case(c)))
    };
    let x_col = find(&X_COLUMNS).ok_or_else(|| missing_column("longitude"))?;
    let y_col = find(&Y_COLUMNS).ok_or_else(|| missing_column("latitude"))?;

    let mut points = PointSet::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let coordinate = |col: usize, name: &'static str| -> Result<f64> {
            let text = record.get(col).unwrap_or("");
            text.parse::<f64>().map_err(|_| Error::InvalidParameter {
                name,
                value: text.to_string(),
                reason: format!("not a number on data line {}", line + 1),
            })
        };
        let mut occurrence = Occurrence::new(coordinate(x_col, "longitude")?, coordinate(y_col, "latitude")?);
        for (col, (header, value)) in headers.iter().zip(record.iter()).enumerate() {
            if col != x_col && col != y_col {
                occurrence
                    .properties
                    .insert(header.to_string(), AttributeValue::parse(value));
            }
        }
        points.push(occurrence);
    }
    Ok(points)
}

fn missing_column(what: &str) -> Error {
    Error::InvalidParameter {
        name: "columns",
        value: what.to_string(),
        reason: "no matching column in the CSV header".into(),
    }
}

pub fn write_points<P: AsRef<Path>>(points: &PointSet, path: P) -> Result<()> {
    write_points_to_writer(points, File::create(path.as_ref())?)
}

/// Write `longitude,latitude` followed by the union of attribute keys
pub fn write_points_to_writer<W: Write>(points: &PointSet, writer: W) -> Result<()> {
    let keys = points.attribute_keys();
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["longitude".to_string(), "latitude".to_string()];
    header.extend(keys.iter().cloned());
    wtr.write_record(&header)?;

    for occurrence in points.iter() {
        let mut row = vec![occurrence.x.to_string(), occurrence.y.to_string()];
        row.extend(keys.iter().map(|k| {
            occurrence
                .get_property(k)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}
