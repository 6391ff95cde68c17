/// Hungarian algorithm: for each row of `scores`, the column assigned to it, if any.
///
/// `scores` is row-major with every row `columns` wide. Rows outnumbering
/// columns leave some rows unassigned.
pub fn maximise(scores: &[Vec<f64>], columns: usize) -> Vec<Option<usize>> {
    let rows = scores.len();
    let n = rows.max(columns);
    if n == 0 {
        return Vec::new();
    }

    // Minimise cost = 1 - score; padding cells cost 1, equal to a zero score.
    let cost = |i: usize, j: usize| -> f64 {
        scores
            .get(i)
            .and_then(|row| row.get(j))
            .map_or(1.0, |score| 1.0 - score)
    };

    // 1-based arrays; index 0 is the virtual start.
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; n + 1];
    let mut owner = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        owner[0] = i;
        let mut j0 = 0usize;
        let mut min_v = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];
        loop {
            used[j0] = true;
            let i0 = owner[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let reduced = cost(i0 - 1, j - 1) - u[i0] - v[j];
                if reduced < min_v[j] {
                    min_v[j] = reduced;
                    way[j] = j0;
                }
                if min_v[j] < delta {
                    delta = min_v[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_v[j] -= delta;
                }
            }
            j0 = j1;
            if owner[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            owner[j0] = owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![None; rows];
    for j in 1..=n {
        let row = owner[j];
        if row >= 1 && row <= rows && j <= columns {
            assignment[row - 1] = Some(j - 1);
        }
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(scores: &[Vec<f64>], assignment: &[Option<usize>]) -> f64 {
        assignment
            .iter()
            .enumerate()
            .filter_map(|(row, col)| col.map(|c| scores[row][c]))
            .sum()
    }

    #[test]
    fn prefers_global_optimum_over_greedy_choice() {
        // Greedy gives row 0 column 0 (0.9) and leaves row 1 with 0.1.
        let scores = vec![vec![0.9, 0.8], vec![0.85, 0.1]];
        let assignment = maximise(&scores, 2);
        assert_eq!(assignment, vec![Some(1), Some(0)]);
        assert!((total(&scores, &assignment) - 1.65).abs() < 1e-9);
    }

    #[test]
    fn handles_more_rows_than_columns() {
        let scores = vec![vec![0.2], vec![0.9], vec![0.5]];
        let assignment = maximise(&scores, 1);
        assert_eq!(assignment, vec![None, Some(0), None]);
    }

    #[test]
    fn handles_more_columns_than_rows() {
        let scores = vec![vec![0.1, 0.2, 0.95]];
        assert_eq!(maximise(&scores, 3), vec![Some(2)]);
    }

    #[test]
    fn columns_are_never_shared() {
        let scores = vec![vec![1.0, 0.0, 0.0]; 3];
        let assignment = maximise(&scores, 3);
        let mut used: Vec<_> = assignment.iter().flatten().collect();
        used.sort();
        used.dedup();
        assert_eq!(used.len(), 3);
    }

    #[test]
    fn empty_input_yields_empty_assignment() {
        assert!(maximise(&[], 0).is_empty());
        assert_eq!(maximise(&[vec![], vec![]], 0), vec![None, None]);
    }
}
