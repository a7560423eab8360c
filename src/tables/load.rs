//! Loaders for the two input tables: observation sites and candidate
//! stations. CSV parsing runs on a blocking task; the station metadata JSON
//! dump produced by the upstream collector is also accepted.

use crate::tables::error::TableError;
use crate::types::latlon::LatLon;
use crate::types::site::Site;
use crate::types::station::{DateRange, Station};
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;
use serde::Deserialize;
use std::path::Path;
use tokio::task;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Loads the sites table from a CSV file.
///
/// Required columns: `name`, `latitude`, `longitude`. Rows with a null name
/// are dropped (there is nothing to report them by); rows with null
/// coordinates are kept with `location: None` so the resolver can report
/// them as skipped.
pub async fn load_sites(path: &Path) -> Result<Vec<Site>, TableError> {
    let path = path.to_path_buf();
    let sites = task::spawn_blocking(move || read_sites(&path)).await??;
    Ok(sites)
}

/// Loads the stations table from a CSV file.
///
/// Required columns: `id`, `name`, `latitude`, `longitude`. The optional
/// `mindate`/`maxdate` columns (ISO dates) populate each station's validity
/// window. Rows with missing or non-finite coordinates are dropped with a
/// warning; a station without a position cannot be a match candidate.
pub async fn load_stations(path: &Path) -> Result<Vec<Station>, TableError> {
    let path = path.to_path_buf();
    let stations = task::spawn_blocking(move || read_stations(&path)).await??;
    Ok(stations)
}

/// Loads stations from the metadata JSON dump the upstream collector emits
/// (an array of objects with `id`, `name`, `latitude`, `longitude`,
/// `mindate`, `maxdate`; unknown fields are ignored).
pub async fn load_stations_json(path: &Path) -> Result<Vec<Station>, TableError> {
    let path = path.to_path_buf();
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| TableError::FileRead(path.clone(), e))?;

    let parsed =
        task::spawn_blocking(move || serde_json::from_slice::<Vec<StationRecord>>(&bytes)).await?;
    let records = parsed.map_err(|e| TableError::JsonParse(path.clone(), e))?;

    let total = records.len();
    let stations: Vec<Station> = records
        .into_iter()
        .filter_map(StationRecord::into_station)
        .collect();
    if stations.len() < total {
        warn!(
            "dropped {} station records without usable coordinates from '{}'",
            total - stations.len(),
            path.display()
        );
    }
    info!("loaded {} stations from '{}'", stations.len(), path.display());
    Ok(stations)
}

#[derive(Debug, Deserialize)]
struct StationRecord {
    id: String,
    name: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    mindate: Option<NaiveDate>,
    maxdate: Option<NaiveDate>,
}

impl StationRecord {
    fn into_station(self) -> Option<Station> {
        let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
            return None;
        };
        let location = LatLon(latitude, longitude);
        if !location.is_finite() {
            return None;
        }
        Some(Station {
            id: self.id,
            name: self.name,
            location,
            inventory: DateRange {
                start: self.mindate,
                end: self.maxdate,
            },
        })
    }
}

fn read_sites(path: &Path) -> Result<Vec<Site>, TableError> {
    let df = read_table(path)?;
    let names = string_column(&df, path, "name")?;
    let names = chunked_str(&names, path)?;
    let lats = float_column(&df, path, "latitude")?;
    let lats = chunked_f64(&lats, path)?;
    let lons = float_column(&df, path, "longitude")?;
    let lons = chunked_f64(&lons, path)?;

    let mut sites = Vec::with_capacity(df.height());
    let mut unnamed = 0usize;
    for ((name, lat), lon) in names.into_iter().zip(lats).zip(lons) {
        let Some(name) = name else {
            unnamed += 1;
            continue;
        };
        let location = match (lat, lon) {
            (Some(lat), Some(lon)) => Some(LatLon(lat, lon)),
            _ => None,
        };
        sites.push(Site {
            name: name.to_string(),
            location,
        });
    }
    if unnamed > 0 {
        warn!(
            "dropped {} unnamed site rows from '{}'",
            unnamed,
            path.display()
        );
    }
    info!("loaded {} sites from '{}'", sites.len(), path.display());
    Ok(sites)
}

fn read_stations(path: &Path) -> Result<Vec<Station>, TableError> {
    let df = read_table(path)?;
    let ids = string_column(&df, path, "id")?;
    let ids = chunked_str(&ids, path)?;
    let names = string_column(&df, path, "name")?;
    let names = chunked_str(&names, path)?;
    let lats = float_column(&df, path, "latitude")?;
    let lats = chunked_f64(&lats, path)?;
    let lons = float_column(&df, path, "longitude")?;
    let lons = chunked_f64(&lons, path)?;
    let starts = optional_date_column(&df, path, "mindate")?;
    let ends = optional_date_column(&df, path, "maxdate")?;

    let mut stations = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    let rows = ids.into_iter().zip(names).zip(lats.into_iter().zip(lons));
    for (row, ((id, name), (lat, lon))) in rows.enumerate() {
        let (Some(id), Some(name), Some(lat), Some(lon)) = (id, name, lat, lon) else {
            skipped += 1;
            continue;
        };
        let location = LatLon(lat, lon);
        if !location.is_finite() {
            skipped += 1;
            continue;
        }
        stations.push(Station {
            id: id.to_string(),
            name: name.to_string(),
            location,
            inventory: DateRange {
                start: starts.as_ref().and_then(|dates| dates[row]),
                end: ends.as_ref().and_then(|dates| dates[row]),
            },
        });
    }
    if skipped > 0 {
        warn!(
            "dropped {} station rows without usable coordinates from '{}'",
            skipped,
            path.display()
        );
    }
    info!(
        "loaded {} stations from '{}'",
        stations.len(),
        path.display()
    );
    Ok(stations)
}

fn read_table(path: &Path) -> Result<DataFrame, TableError> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| TableError::CsvRead(path.to_path_buf(), e))?
        .finish()
        .map_err(|e| TableError::CsvRead(path.to_path_buf(), e))
}

fn required_column<'a>(
    df: &'a DataFrame,
    path: &Path,
    name: &'static str,
) -> Result<&'a Column, TableError> {
    df.column(name).map_err(|_| TableError::MissingColumn {
        path: path.to_path_buf(),
        column: name,
    })
}

fn string_column(df: &DataFrame, path: &Path, name: &'static str) -> Result<Column, TableError> {
    required_column(df, path, name)?
        .cast(&DataType::String)
        .map_err(|e| TableError::CsvRead(path.to_path_buf(), e))
}

fn float_column(df: &DataFrame, path: &Path, name: &'static str) -> Result<Column, TableError> {
    required_column(df, path, name)?
        .cast(&DataType::Float64)
        .map_err(|e| TableError::CsvRead(path.to_path_buf(), e))
}

fn chunked_str<'a>(column: &'a Column, path: &Path) -> Result<&'a StringChunked, TableError> {
    column
        .str()
        .map_err(|e| TableError::CsvRead(path.to_path_buf(), e))
}

fn chunked_f64<'a>(column: &'a Column, path: &Path) -> Result<&'a Float64Chunked, TableError> {
    column
        .f64()
        .map_err(|e| TableError::CsvRead(path.to_path_buf(), e))
}

/// Reads an optional ISO date column; `Ok(None)` when the column is absent,
/// an error when a present value fails to parse.
fn optional_date_column(
    df: &DataFrame,
    path: &Path,
    name: &'static str,
) -> Result<Option<Vec<Option<NaiveDate>>>, TableError> {
    if !df.get_column_names().iter().any(|c| c.as_str() == name) {
        return Ok(None);
    }
    let column = string_column(df, path, name)?;
    let values = chunked_str(&column, path)?;

    let mut dates = Vec::with_capacity(values.len());
    for value in values {
        match value {
            None => dates.push(None),
            Some(raw) => {
                let parsed = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
                    TableError::InvalidDate {
                        path: path.to_path_buf(),
                        column: name,
                        value: raw.to_string(),
                    }
                })?;
                dates.push(Some(parsed));
            }
        }
    }
    Ok(Some(dates))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).expect("failed to write fixture");
        path
    }

    #[tokio::test]
    async fn loads_sites_keeping_coordinateless_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            &dir,
            "sites.csv",
            "name,latitude,longitude\n\
             Alpha,36.97,-122.03\n\
             Beta,,\n\
             Gamma,40.0,-121.5\n",
        );

        let sites = load_sites(&path).await.unwrap();
        assert_eq!(sites.len(), 3);
        assert_eq!(sites[0].name, "Alpha");
        assert_eq!(sites[0].location, Some(LatLon(36.97, -122.03)));
        assert_eq!(sites[1].location, None);
        assert_eq!(sites[2].location, Some(LatLon(40.0, -121.5)));
    }

    #[tokio::test]
    async fn loads_stations_with_validity_windows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            &dir,
            "stations.csv",
            "id,name,latitude,longitude,mindate,maxdate\n\
             GHCND:1,Santa Cruz,36.99,-122.02,1948-01-01,2019-12-31\n\
             GHCND:2,Redding,40.5,-122.4,1950-05-01,2005-06-30\n",
        );

        let stations = load_stations(&path).await.unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].id, "GHCND:1");
        assert_eq!(
            stations[0].inventory.start,
            NaiveDate::from_ymd_opt(1948, 1, 1)
        );
        assert_eq!(
            stations[1].inventory.end,
            NaiveDate::from_ymd_opt(2005, 6, 30)
        );
    }

    #[tokio::test]
    async fn date_columns_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            &dir,
            "stations.csv",
            "id,name,latitude,longitude\n\
             GHCND:1,Santa Cruz,36.99,-122.02\n",
        );

        let stations = load_stations(&path).await.unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].inventory, DateRange::default());
    }

    #[tokio::test]
    async fn station_rows_without_coordinates_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            &dir,
            "stations.csv",
            "id,name,latitude,longitude\n\
             GHCND:1,Santa Cruz,36.99,-122.02\n\
             GHCND:2,Nowhere,,\n",
        );

        let stations = load_stations(&path).await.unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].id, "GHCND:1");
    }

    #[tokio::test]
    async fn missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "sites.csv", "name,latitude\nAlpha,36.97\n");

        let result = load_sites(&path).await;
        assert!(matches!(
            result,
            Err(TableError::MissingColumn {
                column: "longitude",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn unparsable_date_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            &dir,
            "stations.csv",
            "id,name,latitude,longitude,mindate,maxdate\n\
             GHCND:1,Santa Cruz,36.99,-122.02,last-tuesday,2019-12-31\n",
        );

        let result = load_stations(&path).await;
        assert!(matches!(
            result,
            Err(TableError::InvalidDate {
                column: "mindate",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn loads_stations_from_json_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "GHCND:1", "name": "Santa Cruz", "latitude": 36.99,
                 "longitude": -122.02, "mindate": "1948-01-01",
                 "maxdate": "2019-12-31", "elevation": 38.1,
                 "datacoverage": 0.95},
                {"id": "GHCND:2", "name": "No Position",
                 "latitude": null, "longitude": null,
                 "mindate": null, "maxdate": null}
            ]"#,
        )
        .unwrap();

        let stations = load_stations_json(&path).await.unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "Santa Cruz");
        assert_eq!(
            stations[0].inventory.end,
            NaiveDate::from_ymd_opt(2019, 12, 31)
        );
    }
}
