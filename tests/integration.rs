//! Whole-`Index` integration scenarios (spec §8's seed suite, at the public
//! API level rather than the `HnswGraph` internals already covered by unit
//! tests in `src/index/hnsw/graph.rs`).

use zvdb::{Config, DistanceMetric, Index};

fn config(dimension: usize, metric: DistanceMetric) -> Config {
    Config {
        dimension,
        distance_metric: metric,
        rng_seed: Some(7),
        ..Config::default()
    }
}

#[test]
fn basic_3d_euclidean_nearest_neighbor() {
    let index = Index::open(config(3, DistanceMetric::Euclidean)).unwrap();
    index.insert(&[1.0, 2.0, 3.0]).unwrap();
    let closest = index.insert(&[4.0, 5.0, 6.0]).unwrap();
    index.insert(&[7.0, 8.0, 9.0]).unwrap();

    let results = index.search_knn(&[3.5, 4.5, 5.5], 1).unwrap();
    assert_eq!(results[0].0, closest);
}

#[test]
fn empty_index_search_returns_empty() {
    let index = Index::open(config(3, DistanceMetric::Euclidean)).unwrap();
    assert!(index.search_knn(&[0.0, 0.0, 0.0], 5).unwrap().is_empty());
}

#[test]
fn duplicate_vectors_are_both_retrievable_with_distinct_ids() {
    let index = Index::open(config(2, DistanceMetric::Euclidean)).unwrap();
    let a = index.insert(&[1.0, 1.0]).unwrap();
    let b = index.insert(&[1.0, 1.0]).unwrap();
    assert_ne!(a, b);

    let results = index.search_knn(&[1.0, 1.0], 2).unwrap();
    let ids: Vec<u64> = results.iter().map(|(id, _)| *id).collect();
    assert!(ids.contains(&a) && ids.contains(&b));
}

#[test]
fn deleting_the_entry_point_keeps_the_index_queryable() {
    let index = Index::open(config(4, DistanceMetric::Euclidean)).unwrap();
    let mut ids = Vec::new();
    for i in 0..200u32 {
        let base = i as f32;
        ids.push(
            index
                .insert(&[base, base + 1.0, base + 2.0, base + 3.0])
                .unwrap(),
        );
    }

    for _ in 0..5 {
        let before = index.len();
        let victim = ids.pop().unwrap();
        index.delete(victim).unwrap();
        assert_eq!(index.len(), before - 1);

        let results = index.search_knn(&[50.0, 51.0, 52.0, 53.0], 10).unwrap();
        assert_eq!(results.len(), 10);
        assert!(!results.iter().any(|(id, _)| *id == victim));
    }
}

#[test]
fn delete_unknown_id_reports_not_found() {
    let index = Index::open(config(3, DistanceMetric::Euclidean)).unwrap();
    assert!(index.delete(999).is_err());
}

#[test]
fn k_larger_than_index_returns_everything() {
    let index = Index::open(config(3, DistanceMetric::Euclidean)).unwrap();
    index.insert(&[1.0, 1.0, 1.0]).unwrap();
    index.insert(&[2.0, 2.0, 2.0]).unwrap();
    let results = index.search_knn(&[0.0, 0.0, 0.0], 50).unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn persistence_round_trip_preserves_search_results() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("round_trip.zvdb");

    let index = Index::open(config(8, DistanceMetric::Euclidean)).unwrap();
    for i in 0..500u32 {
        let v: Vec<f32> = (0..8).map(|d| ((i * 31 + d * 13) % 97) as f32).collect();
        index
            .insert_with_metadata(&v, format!("item-{i}").into_bytes())
            .unwrap();
    }
    index.save(&path).unwrap();

    let loaded = Index::load(&path).unwrap();
    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.dimension(), index.dimension());

    let query: Vec<f32> = (0..8).map(|d| (d * 5) as f32).collect();
    let before = index.search_knn(&query, 10).unwrap();
    let after = loaded.search_knn(&query, 10).unwrap();
    assert_eq!(before, after);

    for (id, _) in &before {
        assert!(loaded.get_metadata(*id).unwrap().starts_with(b"item-"));
    }
}

#[test]
fn load_rejects_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.zvdb");
    std::fs::write(&path, []).unwrap();
    assert!(Index::load(&path).is_err());
}

#[test]
fn load_rejects_garbage_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.zvdb");
    std::fs::write(&path, b"not a zvdb file at all, just garbage bytes").unwrap();
    assert!(Index::load(&path).is_err());
}

#[test]
fn cosine_metric_end_to_end() {
    let index = Index::open(config(2, DistanceMetric::Cosine)).unwrap();
    let same_direction = index.insert(&[2.0, 0.0]).unwrap();
    index.insert(&[0.0, 2.0]).unwrap();

    let results = index.search_knn(&[1.0, 0.0], 1).unwrap();
    assert_eq!(results[0].0, same_direction);
    assert!(results[0].1.abs() < 1e-4);
}
