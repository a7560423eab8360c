//! Writes the assignment table produced by a resolver run. Plain CSV by
//! default; a `.gz` suffix on the output path selects gzip compression.

use crate::tables::error::TableError;
use crate::types::assignment::Assignment;
use crate::types::latlon::LatLon;
use async_compression::tokio::write::GzipEncoder;
use log::info;
use polars::prelude::*;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Writes one row per assignment: site name and coordinates, matched
/// station name and coordinates, and the distance between them in meters.
pub async fn write_assignments(path: &Path, assignments: &[Assignment]) -> Result<(), TableError> {
    let mut df = assignments_frame(assignments)?;
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut df)
        .map_err(TableError::CsvWrite)?;

    if path.extension().is_some_and(|ext| ext == "gz") {
        let file = tokio::fs::File::create(path)
            .await
            .map_err(|e| TableError::FileWrite(path.to_path_buf(), e))?;
        let mut encoder = GzipEncoder::new(file);
        encoder
            .write_all(&buffer)
            .await
            .map_err(|e| TableError::FileWrite(path.to_path_buf(), e))?;
        encoder
            .shutdown()
            .await
            .map_err(|e| TableError::FileWrite(path.to_path_buf(), e))?;
    } else {
        tokio::fs::write(path, &buffer)
            .await
            .map_err(|e| TableError::FileWrite(path.to_path_buf(), e))?;
    }

    info!(
        "wrote {} assignments to '{}'",
        assignments.len(),
        path.display()
    );
    Ok(())
}

fn assignments_frame(assignments: &[Assignment]) -> Result<DataFrame, TableError> {
    let mut site_names = Vec::with_capacity(assignments.len());
    let mut site_latitudes = Vec::with_capacity(assignments.len());
    let mut site_longitudes = Vec::with_capacity(assignments.len());
    let mut station_names = Vec::with_capacity(assignments.len());
    let mut station_latitudes = Vec::with_capacity(assignments.len());
    let mut station_longitudes = Vec::with_capacity(assignments.len());
    let mut distances = Vec::with_capacity(assignments.len());

    for assignment in assignments {
        let LatLon(site_lat, site_lon) = assignment
            .site
            .location
            .unwrap_or(LatLon(f64::NAN, f64::NAN));
        site_names.push(assignment.site.name.clone());
        site_latitudes.push(site_lat);
        site_longitudes.push(site_lon);
        station_names.push(assignment.station.name.clone());
        station_latitudes.push(assignment.station.location.0);
        station_longitudes.push(assignment.station.location.1);
        distances.push(assignment.distance_m);
    }

    df!(
        "site_name" => site_names,
        "site_latitude" => site_latitudes,
        "site_longitude" => site_longitudes,
        "station_name" => station_names,
        "station_latitude" => station_latitudes,
        "station_longitude" => station_longitudes,
        "distance_m" => distances,
    )
    .map_err(TableError::CsvWrite)
}
