//! Property-based checks for spec §8's universal invariants, run over
//! randomly generated insert/delete/update sequences.

use proptest::prelude::*;
use zvdb::{Config, DistanceMetric, Index};

const DIMENSION: usize = 4;

fn small_index() -> Index {
    Index::open(Config {
        dimension: DIMENSION,
        distance_metric: DistanceMetric::Euclidean,
        m: 4,
        ef_construction: 20,
        ef_search: 20,
        rng_seed: Some(11),
        ..Config::default()
    })
    .unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Insert([f32; DIMENSION]),
    DeleteOldest,
    Query([f32; DIMENSION], usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let vector = prop::array::uniform4(-100.0f32..100.0);
    prop_oneof![
        3 => vector.clone().prop_map(Op::Insert),
        1 => Just(Op::DeleteOldest),
        1 => (vector, 1usize..8).prop_map(|(v, k)| Op::Query(v, k)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Invariant 4 + 5: result count never exceeds `min(k, count)`, results
    /// are sorted ascending by distance, and ids are distinct.
    #[test]
    fn search_results_are_bounded_sorted_and_distinct(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let index = small_index();
        let mut live_ids: Vec<u64> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(v) => {
                    let id = index.insert(&v).unwrap();
                    live_ids.push(id);
                }
                Op::DeleteOldest => {
                    if let Some(id) = live_ids.first().copied() {
                        index.delete(id).unwrap();
                        live_ids.remove(0);
                    }
                }
                Op::Query(v, k) => {
                    let results = index.search_knn(&v, k).unwrap();
                    prop_assert_eq!(results.len(), k.min(index.len()));

                    for pair in results.windows(2) {
                        prop_assert!(pair[0].1 <= pair[1].1);
                    }
                    let ids: std::collections::HashSet<u64> =
                        results.iter().map(|(id, _)| *id).collect();
                    prop_assert_eq!(ids.len(), results.len());

                    for (id, _) in &results {
                        prop_assert!(live_ids.contains(id));
                    }
                }
            }
        }
    }

    /// Invariant 2: `entry_point.is_some()` iff the index is non-empty, as
    /// observed through `len`/`search_knn` (the entry point itself is not
    /// part of the public surface, so this checks the externally visible
    /// corollary: an empty index answers every query with `[]`, a non-empty
    /// one never does).
    #[test]
    fn empty_index_iff_no_results_ever(inserts in prop::collection::vec(prop::array::uniform4(-50.0f32..50.0), 0..20)) {
        let index = small_index();
        for v in &inserts {
            index.insert(v).unwrap();
        }
        let results = index.search_knn(&[0.0; DIMENSION], 3).unwrap();
        prop_assert_eq!(results.is_empty(), inserts.is_empty());
    }

    /// Boundary: inserting a bit-identical vector twice yields two distinct,
    /// both-retrievable ids with distance 0 to themselves.
    #[test]
    fn duplicate_inserts_both_retrievable(v in prop::array::uniform4(-10.0f32..10.0)) {
        let index = small_index();
        let a = index.insert(&v).unwrap();
        let b = index.insert(&v).unwrap();
        prop_assert_ne!(a, b);

        let results = index.search_knn(&v, 2).unwrap();
        let ids: std::collections::HashSet<u64> = results.iter().map(|(id, _)| *id).collect();
        prop_assert!(ids.contains(&a) && ids.contains(&b));
        for (_, d) in &results {
            prop_assert!(*d < 1e-3);
        }
    }
}
