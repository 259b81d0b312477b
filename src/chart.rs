//! Line chart rendering for points recorded by a solver

use std::ops::Range;
use std::path::Path;

use plotters::prelude::*;

use crate::common::{Error, Result};

/// Render `points` as a single line series to a square PNG at `path`
///
/// Returns `Ok(false)` without touching the file system when there is
/// nothing to draw.
pub fn emit(points: &[(f64, f64)], path: &Path, size_px: u32) -> Result<bool> {
    if points.is_empty() {
        return Ok(false);
    }
    let (x_range, y_range) = bounds(points).ok_or_else(|| {
        Error::chart_render(path, "points must have finite coordinates")
    })?;

    let root = BitMapBackend::new(path, (size_px, size_px)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| Error::chart_render(path, e))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(size_px / 20)
        .build_cartesian_2d(x_range, y_range)
        .map_err(|e| Error::chart_render(path, e))?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE).point_size(2))
        .map_err(|e| Error::chart_render(path, e))?;

    root.present().map_err(|e| Error::chart_render(path, e))?;
    tracing::debug!(path = %path.display(), points = points.len(), "Wrote chart");
    Ok(true)
}

/// Axis ranges covering every point; a degenerate axis is widened by one
/// unit on each side
fn bounds(points: &[(f64, f64)]) -> Option<(Range<f64>, Range<f64>)> {
    if points
        .iter()
        .any(|(x, y)| !x.is_finite() || !y.is_finite())
    {
        return None;
    }
    let xs = span(points.iter().map(|p| p.0))?;
    let ys = span(points.iter().map(|p| p.1))?;
    Some((xs, ys))
}

fn span(values: impl Iterator<Item = f64>) -> Option<Range<f64>> {
    let (lo, hi) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    if lo == hi {
        Some(lo - 1.0..hi + 1.0)
    } else {
        Some(lo..hi)
    }
}
