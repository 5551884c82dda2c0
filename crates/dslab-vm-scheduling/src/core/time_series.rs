//! Step-wise time series of environmental signals.

use std::io::Read;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::core::error::SimulationError;

/// Piecewise constant time series: the value at time `t` is the value of the last point at or before `t`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeries {
    points: Vec<(f64, f64)>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(mut points: Vec<(f64, f64)>) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    /// Series with the same value at any time.
    pub fn constant(value: f64) -> Self {
        Self {
            points: vec![(f64::NEG_INFINITY, value)],
        }
    }

    /// Appends point, the time must not be earlier than the time of the last point.
    pub fn push(&mut self, time: f64, value: f64) {
        self.points.push((time, value));
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn value_at(&self, time: f64) -> Option<f64> {
        let idx = self.points.partition_point(|(t, _)| *t <= time);
        if idx == 0 {
            None
        } else {
            Some(self.points[idx - 1].1)
        }
    }

    /// Points with time not later than `time`.
    pub fn until(&self, time: f64) -> TimeSeries {
        Self {
            points: self.points.iter().filter(|(t, _)| *t <= time).cloned().collect(),
        }
    }

    /// Points with time in `(from, to]`.
    pub fn between(&self, from: f64, to: f64) -> TimeSeries {
        Self {
            points: self
                .points
                .iter()
                .filter(|(t, _)| *t > from && *t <= to)
                .cloned()
                .collect(),
        }
    }

    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.points.iter().map(|(_, v)| v).sum::<f64>() / self.points.len() as f64)
    }

    /// Applies function to values of points later than `time`.
    pub fn map_after<F: FnMut(f64) -> f64>(&self, time: f64, mut f: F) -> TimeSeries {
        Self {
            points: self
                .points
                .iter()
                .map(|(t, v)| if *t > time { (*t, f(*v)) } else { (*t, *v) })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct GeoSeriesRow {
    time: f64,
    location: String,
    value: f64,
}

/// Time series per location. Locations keep the order of their first appearance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeoSeries {
    series: IndexMap<String, TimeSeries>,
}

impl GeoSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Series with a single default location.
    pub fn single(series: TimeSeries) -> Self {
        let mut result = Self::new();
        result.insert("default", series);
        result
    }

    pub fn insert<S: Into<String>>(&mut self, location: S, series: TimeSeries) {
        self.series.insert(location.into(), series);
    }

    pub fn get(&self, location: &str) -> Option<&TimeSeries> {
        self.series.get(location)
    }

    /// Returns the series for the location, falling back to the first series
    /// if the location is not set or unknown.
    pub fn for_location(&self, location: Option<&str>) -> Option<&TimeSeries> {
        location
            .and_then(|loc| self.series.get(loc))
            .or_else(|| self.series.values().next())
    }

    pub fn value_at(&self, location: Option<&str>, time: f64) -> Option<f64> {
        self.for_location(location).and_then(|series| series.value_at(time))
    }

    pub fn until(&self, time: f64) -> GeoSeries {
        Self {
            series: self.series.iter().map(|(loc, s)| (loc.clone(), s.until(time))).collect(),
        }
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|loc| loc.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TimeSeries)> {
        self.series.iter().map(|(loc, s)| (loc.as_str(), s))
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Reads series from CSV with `time,location,value` columns.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, SimulationError> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut points: IndexMap<String, Vec<(f64, f64)>> = IndexMap::new();
        for row in reader.deserialize() {
            let row: GeoSeriesRow = row?;
            points.entry(row.location).or_default().push((row.time, row.value));
        }
        Ok(Self {
            series: points
                .into_iter()
                .map(|(loc, points)| (loc, TimeSeries::from_points(points)))
                .collect(),
        })
    }

    pub fn from_csv_file(path: &str) -> Result<Self, SimulationError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_wise_lookup() {
        let series = TimeSeries::from_points(vec![(3600., 2.), (0., 1.)]);
        assert_eq!(series.value_at(-1.), None);
        assert_eq!(series.value_at(0.), Some(1.));
        assert_eq!(series.value_at(3599.), Some(1.));
        assert_eq!(series.value_at(3600.), Some(2.));
        assert_eq!(series.value_at(1e9), Some(2.));
        assert_eq!(TimeSeries::constant(5.).value_at(-1e9), Some(5.));
    }

    #[test]
    fn windows() {
        let series = TimeSeries::from_points(vec![(0., 1.), (1., 2.), (2., 3.), (3., 4.)]);
        assert_eq!(series.until(1.).points(), &[(0., 1.), (1., 2.)]);
        assert_eq!(series.between(1., 3.).points(), &[(2., 3.), (3., 4.)]);
        assert_eq!(series.map_after(2., |v| v * 10.).points()[3], (3., 40.));
        assert_eq!(series.mean(), Some(2.5));
    }

    #[test]
    fn geo_series_from_csv() {
        let data = "time,location,value\n0,eu,10\n0,us,20\n3600,eu,30\n";
        let geo = GeoSeries::from_csv(data.as_bytes()).unwrap();
        assert_eq!(geo.locations().collect::<Vec<_>>(), vec!["eu", "us"]);
        assert_eq!(geo.value_at(Some("eu"), 4000.), Some(30.));
        assert_eq!(geo.value_at(Some("us"), 4000.), Some(20.));
        // unknown location falls back to the first one
        assert_eq!(geo.value_at(Some("asia"), 10.), Some(10.));
        assert_eq!(geo.value_at(None, 10.), Some(10.));
    }
}
