use std::cmp::Ordering;

use serde::Serialize;

/// A decoded data point.
///
/// `rt` is resolved from the acquisition's RT index after the raw record is
/// decoded; until then it holds `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DataPoint {
    /// m/z value
    pub mass: f64,
    /// Signal intensity
    pub intensity: f32,
    /// Native scan number
    pub scan: i32,
    /// Retention time in minutes
    pub rt: f64,
}

impl DataPoint {
    /// Create a point with an unresolved retention time
    pub fn new(mass: f64, intensity: f32, scan: i32) -> Self {
        Self {
            mass,
            intensity,
            scan,
            rt: 0.0,
        }
    }

    /// Zero-intensity filler point at a known scan
    pub fn zero(mass: f64, scan: i32, rt: f64) -> Self {
        Self {
            mass,
            intensity: 0.0,
            scan,
            rt,
        }
    }

    /// Whether this point carries no signal
    pub fn is_zero(&self) -> bool {
        self.intensity == 0.0
    }

    /// Output ordering: retention time first, then mass
    pub fn cmp_rt_mass(&self, other: &Self) -> Ordering {
        self.rt
            .total_cmp(&other.rt)
            .then_with(|| self.mass.total_cmp(&other.mass))
    }
}

/// Sort points by (retention time, mass)
pub fn sort_points(points: &mut [DataPoint]) {
    points.sort_by(DataPoint::cmp_rt_mass);
}

/// Flatten points as (rt, intensity) pairs
pub fn flatten_trace(points: &[DataPoint]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len() * 2);
    for p in points {
        out.push(p.rt);
        out.push(f64::from(p.intensity));
    }
    out
}

/// Flatten points as (mass, intensity) pairs
pub fn flatten_spectrum(points: &[DataPoint]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len() * 2);
    for p in points {
        out.push(p.mass);
        out.push(f64::from(p.intensity));
    }
    out
}

/// Flatten points as (mass, rt, intensity) triples
pub fn flatten_area(points: &[DataPoint]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len() * 3);
    for p in points {
        out.push(p.mass);
        out.push(p.rt);
        out.push(f64::from(p.intensity));
    }
    out
}

/// A fragmentation (MS/MS) event within a queried LC-MS area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentationEvent {
    /// Retention time in minutes
    pub rt: f64,
    /// Precursor m/z selected for fragmentation
    pub parent_mz: f64,
    /// Scan number of the product-ion spectrum
    pub scan: i32,
    /// MS order (2 for MS/MS, 3 for MS3, ...)
    pub ms_order: i32,
    /// Free-form, reader-dependent description
    pub description: String,
}

/// Closed interval reported by range queries
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Range {
    /// Lower bound
    pub low: f64,
    /// Upper bound
    pub high: f64,
}

impl Range {
    /// Create a new range
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Range as a two-element array
    pub fn to_vec(self) -> Vec<f64> {
        vec![self.low, self.high]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_by_rt_then_mass() {
        let mut points = vec![
            DataPoint { mass: 300.0, intensity: 1.0, scan: 2, rt: 1.0 },
            DataPoint { mass: 200.0, intensity: 1.0, scan: 2, rt: 1.0 },
            DataPoint { mass: 100.0, intensity: 1.0, scan: 1, rt: 0.5 },
        ];
        sort_points(&mut points);
        let masses: Vec<f64> = points.iter().map(|p| p.mass).collect();
        assert_eq!(masses, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn test_flatten_layouts() {
        let points = vec![DataPoint { mass: 500.5, intensity: 10.0, scan: 7, rt: 2.5 }];
        assert_eq!(flatten_trace(&points), vec![2.5, 10.0]);
        assert_eq!(flatten_spectrum(&points), vec![500.5, 10.0]);
        assert_eq!(flatten_area(&points), vec![500.5, 2.5, 10.0]);
    }
}
