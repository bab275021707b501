//! Spectrum averaging and the legacy centroiding fallback used by raw readers.
//!
//! Raw readers that can serve averaged spectra merge every survey spectrum of
//! an RT window. Profile data requested as centroids goes through
//! [`centroid_profile`], a simple peak picker that treats every contiguous
//! run of non-zero points as a peak, split at local minima.

use super::{DataPoint, SourceError};

/// Margin added around the m/z window before centroiding profile data, so
/// peaks straddling the bounds are picked from their full shape.
pub const CENTROID_MARGIN: f64 = 1.0;

/// Average spectra by summing intensities at identical masses.
///
/// Each item is an (m/z array, intensity array) pair. Points outside
/// `[mz_low, mz_high]` are ignored; the summed intensity is divided by the
/// number of spectra merged.
pub fn average_spectra<'a, I>(spectra: I, mz_low: f64, mz_high: f64) -> Vec<DataPoint>
where
    I: IntoIterator<Item = (&'a [f64], &'a [f64])>,
{
    let mut count = 0usize;
    let mut merged: Vec<(f64, f64)> = Vec::new();
    for (mz, intensity) in spectra {
        count += 1;
        merged.extend(
            mz.iter()
                .zip(intensity.iter())
                .filter(|(m, _)| **m >= mz_low && **m <= mz_high)
                .map(|(m, i)| (*m, *i)),
        );
    }
    if count == 0 {
        return Vec::new();
    }

    merged.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut out: Vec<DataPoint> = Vec::with_capacity(merged.len());
    let mut sums: Vec<f64> = Vec::with_capacity(merged.len());
    for (mass, intensity) in merged {
        match out.last() {
            Some(last) if last.mass == mass => {
                if let Some(sum) = sums.last_mut() {
                    *sum += intensity;
                }
            }
            _ => {
                out.push(DataPoint::new(mass, 0.0, 0));
                sums.push(intensity);
            }
        }
    }
    let n = count as f64;
    for (point, sum) in out.iter_mut().zip(sums) {
        point.intensity = (sum / n) as f32;
    }
    out
}

/// Pick centroids from a mass-sorted profile.
///
/// A peak is a contiguous run of non-zero points; runs are split at valleys
/// (a descent followed by a rise), and a valley point contributes half of its
/// intensity to each side. The centroid mass is intensity-weighted, the
/// centroid intensity is the summed area.
pub fn centroid_profile(profile: &[DataPoint]) -> Vec<DataPoint> {
    let mut peaks = Vec::new();
    let mut start = 0;
    while start < profile.len() {
        if profile[start].is_zero() {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < profile.len() && !profile[end].is_zero() {
            end += 1;
        }
        centroid_run(&profile[start..end], &mut peaks);
        start = end;
    }
    peaks
}

fn centroid_run(run: &[DataPoint], peaks: &mut Vec<DataPoint>) {
    let last = run.len() - 1;
    let mut edges = vec![0];
    let mut descending = false;
    for k in 1..run.len() {
        let (prev, cur) = (run[k - 1].intensity, run[k].intensity);
        if cur < prev {
            descending = true;
        } else if cur > prev && descending {
            edges.push(k - 1);
            descending = false;
        }
    }
    edges.push(last);

    for pair in edges.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let mut area = 0.0;
        let mut weighted = 0.0;
        for (k, point) in run.iter().enumerate().take(b + 1).skip(a) {
            let mut weight = f64::from(point.intensity);
            // valley points are shared between neighbouring peaks
            if (k == a && a != 0) || (k == b && b != last) {
                weight /= 2.0;
            }
            area += weight;
            weighted += weight * point.mass;
        }
        if area > 0.0 {
            peaks.push(DataPoint::new(weighted / area, area as f32, 0));
        }
    }
}

/// Averaged spectrum in the representation the caller asked for.
///
/// `profile_data` describes what the source holds, `profile` what was
/// requested. Centroided data cannot be turned back into profiles; profile
/// data requested as centroids is averaged over a widened window, centroided
/// and trimmed back to the request.
pub fn averaged_spectrum<'a, I>(
    spectra: I,
    profile_data: bool,
    profile: bool,
    mz_low: f64,
    mz_high: f64,
) -> Result<Vec<DataPoint>, SourceError>
where
    I: IntoIterator<Item = (&'a [f64], &'a [f64])>,
{
    match (profile_data, profile) {
        (false, true) => Err(SourceError::unavailable(
            "profile data is not available, source holds centroided spectra only",
        )),
        (true, false) => {
            let averaged = average_spectra(
                spectra,
                mz_low - CENTROID_MARGIN,
                mz_high + CENTROID_MARGIN,
            );
            Ok(centroid_profile(&averaged)
                .into_iter()
                .filter(|p| p.mass >= mz_low && p.mass <= mz_high)
                .collect())
        }
        _ => Ok(average_spectra(spectra, mz_low, mz_high)),
    }
}
