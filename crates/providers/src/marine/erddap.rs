//! ERDDAP griddap CSV queries.
//!
//! A griddap CSV response has two header rows (names, then units) followed by
//! one row per grid cell. Point queries return a single data row whose last
//! column is the requested variable.

use crate::error::{ProviderError, ProviderResult};

/// One data row of a point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GriddapPoint {
    /// Grid cell latitude, when the response includes it.
    pub latitude: Option<f64>,
    /// Grid cell longitude in the dataset's convention.
    pub longitude: Option<f64>,
    pub value: f64,
}

/// Single-value dimension constraint `[(v):1:(v)]`.
pub fn point_dim(value: &str) -> String {
    format!("[({v}):1:({v})]", v = value)
}

pub fn coord_dim(value: f64) -> String {
    point_dim(&format!("{:.4}", value))
}

/// `{base}/{dataset}.csv?{variable}{dims...}`
pub fn griddap_url(base_url: &str, dataset: &str, variable: &str, dims: &[String]) -> String {
    format!(
        "{}/{}.csv?{}{}",
        base_url.trim_end_matches('/'),
        dataset,
        variable,
        dims.concat()
    )
}

fn parse_cell(cols: &[&str], idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| cols.get(i)).and_then(|s| s.trim().parse::<f64>().ok())
}

/// Parse the first data row of a griddap CSV response.
pub fn parse_point_csv(text: &str) -> ProviderResult<GriddapPoint> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| ProviderError::Empty("empty griddap response".into()))?
        .split(',')
        .map(str::trim)
        .collect();
    // Units row.
    lines.next();

    let row = lines
        .next()
        .ok_or_else(|| ProviderError::Empty("griddap response has no data rows".into()))?;
    let cols: Vec<&str> = row.split(',').map(str::trim).collect();
    if cols.len() != header.len() {
        return Err(ProviderError::Parse(format!(
            "griddap row has {} columns, header has {}",
            cols.len(),
            header.len()
        )));
    }

    let raw = cols.last().copied().unwrap_or_default();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("null") {
        return Err(ProviderError::Empty("griddap value is missing".into()));
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| ProviderError::Parse(format!("griddap value is not numeric: {}", raw)))?;
    if !value.is_finite() {
        return Err(ProviderError::Empty("griddap value is not finite".into()));
    }

    let column = |name: &str| header.iter().position(|h| *h == name);
    Ok(GriddapPoint {
        latitude: parse_cell(&cols, column("latitude")),
        longitude: parse_cell(&cols, column("longitude")),
        value,
    })
}

/// Reject values outside `[min, max]`.
pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> ProviderResult<f64> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ProviderError::OutOfRange { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::load_fixture;

    #[test]
    fn test_url_building() {
        let url = griddap_url(
            "https://coastwatch.pfeg.noaa.gov/erddap/griddap/",
            "ncdc_oisst_v2_avhrr_by_time_zlev_lat_lon",
            "sst",
            &[point_dim("2018-07-12T12:00:00Z"), point_dim("0.0"), coord_dim(42.5), coord_dim(274.6)],
        );
        assert_eq!(
            url,
            "https://coastwatch.pfeg.noaa.gov/erddap/griddap/ncdc_oisst_v2_avhrr_by_time_zlev_lat_lon.csv?sst\
[(2018-07-12T12:00:00Z):1:(2018-07-12T12:00:00Z)][(0.0):1:(0.0)][(42.5000):1:(42.5000)][(274.6000):1:(274.6000)]"
        );
    }

    #[test]
    fn test_parse_point() {
        let point = parse_point_csv(&load_fixture("oisst.csv")).unwrap();
        assert_eq!(point.value, 22.1);
        assert_eq!(point.latitude, Some(42.625));
        assert_eq!(point.longitude, Some(274.625));
    }

    #[test]
    fn test_nan_is_empty() {
        let err = parse_point_csv(&load_fixture("oisst_nan.csv")).unwrap_err();
        assert!(matches!(err, ProviderError::Empty(_)));
    }

    #[test]
    fn test_header_only_is_empty() {
        let err = parse_point_csv("time,sst\nUTC,degree_C\n").unwrap_err();
        assert_eq!(err.kind(), "empty");
        assert_eq!(parse_point_csv("").unwrap_err().kind(), "empty");
    }

    #[test]
    fn test_ragged_row() {
        let err = parse_point_csv("time,sst\nUTC,degree_C\n2018-07-12,1.0,2.0\n").unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn test_check_range() {
        assert_eq!(check_range("sst", 22.1, -5.0, 50.0).unwrap(), 22.1);
        assert!(matches!(
            check_range("sst", 61.0, -5.0, 50.0),
            Err(ProviderError::OutOfRange { field: "sst", .. })
        ));
    }
}
