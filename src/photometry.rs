//! Relative photometry: a source's flux minus a reference source's flux at
//! matching times.

use crate::data::model::ObservationSeries;

/// Difference `source` against `reference`, both in chronological order.
///
/// Two cursors walk the series. When the current timestamps are closer than
/// `threshold`, one record is emitted: the source record with flux
/// `f_src - f_ref` and flux error `e_src + e_ref`. After every comparison the
/// reference cursor advances if the source is later (or the source cursor is
/// on its last record); otherwise the source cursor advances. Only one cursor
/// moves per step, so a reference point pairs with at most one source point
/// before it is passed.
///
/// The walk stops once both cursors sit on their last record, or when an
/// advance would step past the end of either series.
pub fn relative_photometry(
    threshold: f64,
    source: &ObservationSeries,
    reference: &ObservationSeries,
) -> ObservationSeries {
    let (src, refs) = (&source.records, &reference.records);
    if src.is_empty() || refs.is_empty() {
        return ObservationSeries::default();
    }

    let (last_s, last_r) = (src.len() - 1, refs.len() - 1);
    let (mut cs, mut ca) = (0usize, 0usize);
    let mut out = Vec::new();
    loop {
        let (s, r) = (&src[cs], &refs[ca]);
        if (s.time - r.time).abs() < threshold {
            let mut rec = s.clone();
            rec.flux = s.flux - r.flux;
            rec.flux_error = s.flux_error + r.flux_error;
            out.push(rec);
        }

        if s.time > r.time || cs == last_s {
            ca += 1;
        } else {
            cs += 1;
        }
        if ca > last_r || cs > last_s || (ca == last_r && cs == last_s) {
            break;
        }
    }

    log::info!(
        "relative photometry: {} matched of {} source records",
        out.len(),
        src.len()
    );
    ObservationSeries::from_records(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::series;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_match_within_threshold() {
        let source = series(&[(1.0, 500.0), (2.0, 600.0)]);
        let reference = series(&[(1.1, 200.0)]);
        let out = relative_photometry(0.5, &source, &reference);
        assert_eq!(out.times(), vec![1.0]);
        assert_eq!(out.records[0].flux, 300.0);
        assert_eq!(out.records[0].flux_error, 2.0);
    }

    #[test]
    fn test_interleaved_clocks() {
        let source = series(&[(0.0, 10.0), (1.0, 11.0), (2.0, 12.0), (3.0, 13.0)]);
        let reference = series(&[(0.1, 1.0), (1.05, 2.0), (2.2, 3.0), (3.1, 4.0)]);
        let out = relative_photometry(0.3, &source, &reference);
        // The last pair is never compared: the walk ends when both cursors
        // reach their final records.
        assert_eq!(out.times(), vec![0.0, 1.0, 2.0]);
        let fluxes = out.fluxes();
        assert_relative_eq!(fluxes[0], 9.0);
        assert_relative_eq!(fluxes[1], 9.0);
        assert_relative_eq!(fluxes[2], 9.0);
    }

    #[test]
    fn test_reference_exhausted_early() {
        let source = series(&[(5.0, 1.0), (6.0, 1.0), (7.0, 1.0)]);
        let reference = series(&[(0.0, 1.0)]);
        assert!(relative_photometry(0.5, &source, &reference).is_empty());
    }

    #[test]
    fn test_single_points_compared_once() {
        let out = relative_photometry(1.0, &series(&[(3.0, 8.0)]), &series(&[(3.2, 5.0)]));
        assert_eq!(out.fluxes(), vec![3.0]);
    }

    #[test]
    fn test_empty_inputs() {
        let s = series(&[(0.0, 1.0)]);
        assert!(relative_photometry(1.0, &s, &ObservationSeries::default()).is_empty());
        assert!(relative_photometry(1.0, &ObservationSeries::default(), &s).is_empty());
    }
}
