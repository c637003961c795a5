//! Stratified train/test split and class-balanced sample weights.

use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Row indices, ascending.
    pub train: Vec<usize>,
    /// Row indices, ascending.
    pub test: Vec<usize>,
}

/// Split rows so each class appears in the test set in proportion
/// `test_fraction`. A class with two or more rows always lands on both sides.
pub fn stratified_split<R: Rng + ?Sized>(
    labels: &[bool],
    test_fraction: f64,
    rng: &mut R,
) -> Split {
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in [false, true] {
        let mut idx: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        if idx.is_empty() {
            continue;
        }
        idx.shuffle(rng);

        let n = idx.len();
        let mut n_test = (test_fraction * n as f64).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        } else {
            n_test = 0;
        }
        test.extend_from_slice(&idx[..n_test]);
        train.extend_from_slice(&idx[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Split { train, test }
}

/// Weight `n / (2 · n_class)` per row, so both classes carry equal total weight.
pub fn balanced_class_weights(labels: &[bool]) -> Vec<f64> {
    let n = labels.len() as f64;
    let n_pos = labels.iter().filter(|&&y| y).count() as f64;
    let n_neg = n - n_pos;
    let w_pos = if n_pos > 0.0 { n / (2.0 * n_pos) } else { 0.0 };
    let w_neg = if n_neg > 0.0 { n / (2.0 * n_neg) } else { 0.0 };
    labels
        .iter()
        .map(|&y| if y { w_pos } else { w_neg })
        .collect()
}
