//! Property-based tests for page indexing, compaction, interval merging
//! and pooled folder batches

mod common;

mod property_tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use mzrange::cache::{
        compact_chromatogram, merge_intervals, BinaryIndexedStore, FolderIndexedStore, RtIndex,
        FOLDER_CACHE_NAME,
    };
    use mzrange::dispatch::{BatchQuery, QueryKind};
    use mzrange::pool::{Entry, EntrySource, ResourceClass};
    use mzrange::source::{DataPoint, MsSource, Window};
    use proptest::prelude::*;

    use super::common::{
        folder_cache_bytes, single_cache_bytes, survey_scans, write_file, Member, FOLDER_PER_PAGE,
        SINGLE_PER_PAGE,
    };

    const SCANS: i32 = 12;

    fn record() -> impl Strategy<Value = (f64, f32, i32)> {
        (100.0f64..200.0, 1.0f32..1000.0, 1..=SCANS)
    }

    const MEMBERS: [&str; 3] = ["north", "south", "west"];

    fn folder_record() -> impl Strategy<Value = (f64, f32, i32, i32)> {
        (100.0f64..200.0, 1.0f32..1000.0, 1..=SCANS, 1..=3i32)
    }

    /// (member, m/z low, m/z width, rt a, rt b, chromatogram)
    fn folder_query() -> impl Strategy<Value = (usize, f64, f64, f64, f64, bool)> {
        (
            0..MEMBERS.len(),
            95.0f64..200.0,
            0.0f64..20.0,
            0.0f64..7.0,
            0.0f64..7.0,
            any::<bool>(),
        )
    }

    fn sort_key(p: &(f64, f64, f32)) -> (u64, u64, u32) {
        (p.0.to_bits(), p.1.to_bits(), p.2.to_bits())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// A window query returns exactly the records a linear scan finds,
        /// however the records fall across pages.
        #[test]
        fn prop_window_query_matches_linear_scan(
            records in prop::collection::vec(record(), 1..(SINGLE_PER_PAGE * 3)),
            bounds in (100.0f64..200.0, 0.0f64..40.0),
            rts in (0.0f64..7.0, 0.0f64..7.0),
        ) {
            let scans = survey_scans(SCANS);
            let bytes = single_cache_bytes(&scans, &records);
            let mut store = BinaryIndexedStore::from_reader(Cursor::new(bytes)).unwrap();

            let (mz_low, width) = bounds;
            let (rt_a, rt_b) = rts;
            let window = Window::new(mz_low, mz_low + width, rt_a.min(rt_b), rt_a.max(rt_b));

            let mut found: Vec<(f64, f64, f32)> = store
                .points(window)
                .unwrap()
                .into_iter()
                .map(|p| (p.mass, p.rt, p.intensity))
                .collect();
            let mut expected: Vec<(f64, f64, f32)> = records
                .iter()
                .map(|&(mass, intensity, scan)| (mass, f64::from(scan) * 0.5, intensity))
                .filter(|&(mass, rt, _)| window.contains_mass(mass) && window.contains_rt(rt))
                .collect();

            found.sort_by_key(sort_key);
            expected.sort_by_key(sort_key);
            prop_assert_eq!(found, expected);
        }

        /// Compacting a compacted trace changes nothing, and no three
        /// consecutive points are zero.
        #[test]
        fn prop_compaction_is_idempotent(
            hits in prop::collection::vec((1..=SCANS, 1.0f32..500.0, 0.0f64..0.01), 0..40),
            boundary_zeros in any::<bool>(),
        ) {
            let rt_index = RtIndex::from_pairs(survey_scans(SCANS)).unwrap();
            let mut points: Vec<DataPoint> = hits
                .iter()
                .map(|&(scan, intensity, offset)| DataPoint {
                    mass: 500.0 + offset,
                    intensity,
                    scan,
                    rt: f64::from(scan) * 0.5,
                })
                .collect();

            compact_chromatogram(&mut points, &rt_index, 500.005, boundary_zeros);
            let once = points.clone();
            compact_chromatogram(&mut points, &rt_index, 500.005, boundary_zeros);
            prop_assert_eq!(&once, &points);

            prop_assert!(points.windows(2).all(|w| w[0].rt < w[1].rt));
            prop_assert!(!points
                .windows(3)
                .any(|w| w.iter().all(DataPoint::is_zero)));
        }

        /// Merged intervals are sorted, disjoint, and cover every input.
        #[test]
        fn prop_merged_intervals_cover_inputs(
            intervals in prop::collection::vec((0.0f64..100.0, 0.0f64..10.0), 0..30),
        ) {
            let input: Vec<(f64, f64)> = intervals.iter().map(|&(lo, w)| (lo, lo + w)).collect();
            let merged = merge_intervals(input.iter().copied());

            prop_assert!(merged.iter().all(|(lo, hi)| lo <= hi));
            prop_assert!(merged.windows(2).all(|w| w[0].1 < w[1].0));
            for (lo, hi) in &input {
                prop_assert!(merged.iter().any(|(m_lo, m_hi)| m_lo <= lo && hi <= m_hi));
            }
        }

        /// Pooled execution of overlapping windows answers every query
        /// exactly as its acquisition would on its own.
        #[test]
        fn prop_pooled_matches_single_acquisitions(
            records in prop::collection::vec(folder_record(), 1..(FOLDER_PER_PAGE * 2)),
            requests in prop::collection::vec(folder_query(), 1..8),
        ) {
            let dir = tempfile::tempdir().unwrap();
            let members: Vec<Member> = MEMBERS
                .iter()
                .enumerate()
                .map(|(i, name)| Member::new(i as i32 + 1, name, survey_scans(SCANS)))
                .collect();
            let bytes = folder_cache_bytes(&members, &records);
            let path = write_file(dir.path(), FOLDER_CACHE_NAME, &bytes);
            let store = Arc::new(FolderIndexedStore::open(&path).unwrap());

            let mut queries: Vec<BatchQuery> = requests
                .iter()
                .map(|&(member, mz_low, width, rt_a, rt_b, chromatogram)| {
                    let name = MEMBERS[member];
                    let entry = Entry::new(
                        name,
                        &path,
                        ResourceClass::Cache,
                        EntrySource::FolderMember(Arc::clone(&store)),
                    );
                    let window = Window::new(mz_low, mz_low + width, rt_a.min(rt_b), rt_a.max(rt_b));
                    let kind = if chromatogram { QueryKind::Chromatogram } else { QueryKind::Slice };
                    BatchQuery::new(name, Some(Arc::new(entry)), window, kind, false)
                })
                .collect();

            prop_assert_eq!(store.run_pooled(&mut queries).unwrap(), queries.len());

            for (request, query) in requests.iter().zip(&queries) {
                let &(member, mz_low, width, rt_a, rt_b, chromatogram) = request;
                let window = Window::new(mz_low, mz_low + width, rt_a.min(rt_b), rt_a.max(rt_b));
                let mut acquisition = store.open_acquisition(MEMBERS[member]).unwrap();
                let expected = if chromatogram {
                    acquisition.trace(window).unwrap()
                } else {
                    acquisition.area(window, false).unwrap()
                };
                prop_assert_eq!(query.result(), Some(expected.as_slice()));
            }
        }
    }
}
