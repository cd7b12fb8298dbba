use super::*;

const TOLERANCE: f32 = 1e-5;

fn sample_vectors() -> Vec<Vec<f32>> {
    vec![
        vec![3.0, 4.0, 0.0],
        vec![0.0, 0.0, 2.0],
        vec![1.0, 1.0, 1.0],
        vec![-3.0, -4.0, 0.0],
    ]
}

#[test]
fn build_normalizes_rows() {
    let index = VectorIndex::build(3, sample_vectors()).expect("should build index");

    assert_eq!(index.len(), 4);
    assert_eq!(index.dimension(), 3);

    let first = index.row(0).expect("row 0 exists");
    assert!((first[0] - 0.6).abs() < TOLERANCE);
    assert!((first[1] - 0.8).abs() < TOLERANCE);

    for row in 0..index.len() {
        let values = index.row(row).expect("row exists");
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < TOLERANCE);
    }
}

#[test]
fn zero_rows_stay_zero() {
    let index =
        VectorIndex::build(2, vec![vec![0.0, 0.0], vec![1.0, 0.0]]).expect("should build index");

    assert_eq!(index.row(0), Some(&[0.0, 0.0][..]));

    let hits = index.search(&[1.0, 0.0], 2).expect("search should succeed");
    assert_eq!(hits[0].index, 1);
    assert_eq!(hits[1].index, 0);
    assert_eq!(hits[1].score, 0.0);
}

#[test]
fn build_rejects_mismatched_rows() {
    let result = VectorIndex::build(3, vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0]]);
    assert!(matches!(result, Err(HandbookError::Embedding(_))));
}

#[test]
fn build_rejects_zero_dimension() {
    assert!(VectorIndex::build(0, Vec::new()).is_err());
}

#[test]
fn stored_row_is_its_own_best_match() {
    let vectors = sample_vectors();
    let index = VectorIndex::build(3, vectors.clone()).expect("should build index");

    for (row, vector) in vectors.iter().enumerate() {
        let hits = index.search(vector, 1).expect("search should succeed");
        assert_eq!(hits[0].index, row);
        assert!((hits[0].score - 1.0).abs() < TOLERANCE);
    }
}

#[test]
fn scores_are_non_increasing() {
    let index = VectorIndex::build(3, sample_vectors()).expect("should build index");

    let hits = index
        .search(&[1.0, 2.0, 0.5], 4)
        .expect("search should succeed");

    assert_eq!(hits.len(), 4);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    for hit in &hits {
        assert!((-1.0 - TOLERANCE..=1.0 + TOLERANCE).contains(&hit.score));
    }
    // the opposite vector comes last
    assert_eq!(hits[3].index, 3);
    assert!(hits[3].score < 0.0);
}

#[test]
fn ties_go_to_lower_index() {
    let vectors = vec![
        vec![0.0, 1.0],
        vec![2.0, 0.0],
        vec![0.0, 3.0],
        vec![1.0, 0.0],
    ];
    let index = VectorIndex::build(2, vectors).expect("should build index");

    let hits = index.search(&[5.0, 0.0], 4).expect("search should succeed");
    let order = hits.iter().map(|h| h.index).collect::<Vec<_>>();
    assert_eq!(order, vec![1, 3, 0, 2]);
}

#[test]
fn k_larger_than_index_returns_everything() {
    let index = VectorIndex::build(3, sample_vectors()).expect("should build index");

    let hits = index.search(&[1.0, 0.0, 0.0], 50).expect("search should succeed");
    assert_eq!(hits.len(), 4);
}

#[test]
fn k_zero_returns_nothing() {
    let index = VectorIndex::build(3, sample_vectors()).expect("should build index");
    let hits = index.search(&[1.0, 0.0, 0.0], 0).expect("search should succeed");
    assert!(hits.is_empty());
}

#[test]
fn empty_index_search() {
    let index = VectorIndex::build(3, Vec::new()).expect("should build index");
    assert!(index.is_empty());

    let hits = index.search(&[1.0, 0.0, 0.0], 5).expect("search should succeed");
    assert!(hits.is_empty());
}

#[test]
fn query_dimension_mismatch() {
    let index = VectorIndex::build(3, sample_vectors()).expect("should build index");
    let result = index.search(&[1.0, 0.0], 2);
    assert!(matches!(result, Err(HandbookError::Retrieval(_))));
}

#[test]
fn zero_query_scores_zero() {
    let index = VectorIndex::build(3, sample_vectors()).expect("should build index");
    let hits = index.search(&[0.0, 0.0, 0.0], 4).expect("search should succeed");

    assert!(hits.iter().all(|h| h.score == 0.0));
    let order = hits.iter().map(|h| h.index).collect::<Vec<_>>();
    assert_eq!(order, vec![0, 1, 2, 3]);
}

#[test]
fn from_normalized_round_trips_rows() {
    let index = VectorIndex::build(3, sample_vectors()).expect("should build index");
    let restored = VectorIndex::from_normalized(3, index.as_slice().to_vec())
        .expect("should restore index");
    assert_eq!(index, restored);

    assert!(VectorIndex::from_normalized(3, vec![1.0; 4]).is_err());
}
