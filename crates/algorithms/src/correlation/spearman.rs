//! Spearman rank correlation

/// 1-based ranks; tied values share the average of the ranks they span
pub fn rank(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end hold ranks start+1..=end
        let average = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = average;
        }
        start = end;
    }
    ranks
}

/// Pearson's coefficient, `None` when either series has zero variance or
/// there are fewer than two pairs
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return None;
    }
    Some((cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
}

/// Spearman's rank correlation: Pearson over average ranks
pub fn spearman(a: &[f64], b: &[f64]) -> Option<f64> {
    pearson(&rank(a), &rank(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rank_ties() {
        assert_eq!(rank(&[10.0, 20.0, 10.0, 5.0]), vec![2.5, 4.0, 2.5, 1.0]);
        assert_eq!(rank(&[3.0, 3.0, 3.0]), vec![2.0, 2.0, 2.0]);
        assert!(rank(&[]).is_empty());
    }

    #[test]
    fn test_monotonic_is_one() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b: Vec<f64> = a.iter().map(|x: &f64| x.powi(3) + 2.0).collect();
        assert_relative_eq!(spearman(&a, &b).unwrap(), 1.0, epsilon = 1e-12);

        let reversed: Vec<f64> = a.iter().map(|x| -x.exp()).collect();
        assert_relative_eq!(spearman(&a, &reversed).unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_known_value() {
        // d = [0, -1, 1, 0, 0]: rho = 1 - 6 * 2 / (5 * 24) = 0.9
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [1.0, 3.0, 2.0, 4.0, 5.0];
        assert_relative_eq!(spearman(&a, &b).unwrap(), 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_undefined() {
        assert_eq!(spearman(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]), None);
        assert_eq!(spearman(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[], &[]), None);
    }
}
