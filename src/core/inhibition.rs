//! Inhibition selects the winning columns from their (boosted, tie-broken) overlap scores.
//!
//! Both variants are pure functions over a score slice. A column with a score of zero or less
//! never wins, so a column without any overlap cannot become active through competition.
//!
//! - Global inhibition keeps the `round(density * num_columns)` best scores of the whole region.
//! - Local inhibition lets every column compete only with its topological neighbors. It is a
//!   greedy single pass in column order: a winner's score is nudged up so that neighbors visited
//!   later see it as already won. The result depends on that order and the pass must stay sequential.

use super::topology::Topology;

/// Selects the columns with the `round(density * num_columns)` highest scores.
/// Returned indices are sorted ascending. Exact ties are resolved by lower column index.
pub fn inhibit_columns_global(scores: &[f32], density: f32) -> Vec<usize> {
    let num_active = (density * scores.len() as f32).round() as usize;

    let mut candidates: Vec<usize> = (0..scores.len()).filter(|&c| scores[c] > 0.0).collect();
    candidates.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    candidates.truncate(num_active);
    candidates.sort_unstable();
    candidates
}

/// Selects winners within every column's neighborhood of `radius` in `topology`.
///
/// Column `c` wins if fewer than `floor(0.5 + density * (neighbors + 1))` of its neighbors
/// have a strictly higher score. Each winner's score is raised by a thousandth of the maximum
/// score before the next column is visited.
pub fn inhibit_columns_local(
    scores: &[f32],
    density: f32,
    topology: &Topology,
    radius: usize,
    wrap_around: bool,
) -> Vec<usize> {
    let mut scores = scores.to_vec();
    let add_to_winners = scores.iter().fold(0.0_f32, |acc, &s| acc.max(s)) / 1000.0;
    let mut active = Vec::new();

    for column in 0..scores.len() {
        if scores[column] <= 0.0 {
            continue;
        }

        let mut num_neighbors = 0;
        let mut num_bigger = 0;
        for neighbor in topology.neighborhood(column, radius, wrap_around) {
            if neighbor == column {
                continue;
            }
            num_neighbors += 1;
            if scores[neighbor] > scores[column] {
                num_bigger += 1;
            }
        }

        let num_active = (0.5 + density * (num_neighbors + 1) as f32) as usize;
        if num_bigger < num_active {
            active.push(column);
            scores[column] += add_to_winners;
        }
    }

    active
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_picks_top_scores() {
        let scores = [1.0, 2.0, 1.0, 4.0, 8.0, 3.0, 12.0, 5.0, 4.0, 1.0];
        assert_eq!(inhibit_columns_global(&scores, 0.3), vec![4, 6, 7]);

        let scores: Vec<f32> = (0..10).map(|v| v as f32).collect();
        assert_eq!(inhibit_columns_global(&scores, 0.5), vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn global_count_is_rounded_density() {
        let scores: Vec<f32> = (1..=20).map(|v| v as f32).collect();
        // 0.125 * 20 = 2.5 rounds to 3.
        assert_eq!(inhibit_columns_global(&scores, 0.125).len(), 3);
        assert_eq!(inhibit_columns_global(&scores, 0.02).len(), 0);
    }

    #[test]
    fn global_never_selects_zero_scores() {
        let scores = [0.0, 3.0, 0.0, 0.0, 1.0, 0.0];
        assert_eq!(inhibit_columns_global(&scores, 0.5), vec![1, 4]);
    }

    #[test]
    fn local_inhibition_with_wrap_around() {
        let topology = Topology::new(&[10]);
        let scores = [1.0, 2.0, 7.0, 0.0, 3.0, 4.0, 16.0, 1.0, 1.5, 1.7];

        assert_eq!(
            inhibit_columns_local(&scores, 0.5, &topology, 2, true),
            vec![1, 2, 5, 6, 8, 9]
        );
        assert_eq!(
            inhibit_columns_local(&scores, 0.5, &topology, 2, false),
            vec![1, 2, 5, 6, 9]
        );
        assert_eq!(
            inhibit_columns_local(&scores, 0.5, &topology, 3, true),
            vec![1, 2, 4, 5, 6, 9]
        );
        assert_eq!(
            inhibit_columns_local(&scores, 0.5, &topology, 3, false),
            vec![1, 2, 4, 5, 6, 9]
        );
    }

    #[test]
    fn local_winners_shadow_later_ties() {
        let topology = Topology::new(&[10]);
        let scores = [1.0; 10];
        assert_eq!(
            inhibit_columns_local(&scores, 0.3333, &topology, 3, true),
            vec![0, 1, 4, 5]
        );
        assert_eq!(
            inhibit_columns_local(&scores, 0.3333, &topology, 3, false),
            vec![0, 1, 4, 5, 8]
        );
    }

    #[test]
    fn local_ring_has_no_adjacent_winners() {
        let topology = Topology::new(&[8]);
        let patterns: [[f32; 8]; 3] = [
            [1.0; 8],
            [3.0, 1.0, 3.0, 2.0, 5.0, 5.0, 1.0, 3.0],
            [2.0, 4.0, 4.0, 1.0, 1.0, 6.0, 2.0, 6.0],
        ];
        for scores in patterns {
            let active = inhibit_columns_local(&scores, 0.3, &topology, 1, true);
            assert!(!active.is_empty());
            for &column in &active {
                let next = (column + 1) % 8;
                assert!(!active.contains(&next), "{column} and {next} both active in {active:?}");
            }
        }
    }
}
