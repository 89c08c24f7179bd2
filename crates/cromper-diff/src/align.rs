//! Sequence alignment over instruction mnemonics.

/// One step of an alignment between `a` and `b`, by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Equal(usize, usize),
    Replace(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// Minimal edit script (unit cost for substitute, delete, insert).
pub fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> Vec<EditOp> {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    let mut dp = vec![0u32; (n + 1) * width];
    for i in 0..=n {
        dp[i * width] = i as u32;
    }
    for j in 0..=m {
        dp[j] = j as u32;
    }
    for i in 1..=n {
        for j in 1..=m {
            let sub = dp[(i - 1) * width + j - 1] + u32::from(a[i - 1] != b[j - 1]);
            let del = dp[(i - 1) * width + j] + 1;
            let ins = dp[i * width + j - 1] + 1;
            dp[i * width + j] = sub.min(del).min(ins);
        }
    }

    let mut ops = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        let here = dp[i * width + j];
        if i > 0 && j > 0 {
            let diag = dp[(i - 1) * width + j - 1];
            if a[i - 1] == b[j - 1] && here == diag {
                ops.push(EditOp::Equal(i - 1, j - 1));
                i -= 1;
                j -= 1;
                continue;
            }
            if here == diag + 1 {
                ops.push(EditOp::Replace(i - 1, j - 1));
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if i > 0 && here == dp[(i - 1) * width + j] + 1 {
            ops.push(EditOp::Delete(i - 1));
            i -= 1;
        } else {
            ops.push(EditOp::Insert(j - 1));
            j -= 1;
        }
    }
    ops.reverse();
    ops
}

/// Line diff: longest common subsequence, with each run of deletions and
/// insertions between matches paired up as replacements.
pub fn lcs_diff<T: PartialEq>(a: &[T], b: &[T]) -> Vec<EditOp> {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    // dp[i][j] = LCS length of a[i..] and b[j..]
    let mut dp = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i * width + j] = if a[i] == b[j] {
                dp[(i + 1) * width + j + 1] + 1
            } else {
                dp[(i + 1) * width + j].max(dp[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n.max(m));
    let mut deletes = Vec::new();
    let mut inserts = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && a[i] == b[j] {
            flush_run(&mut ops, &mut deletes, &mut inserts);
            ops.push(EditOp::Equal(i, j));
            i += 1;
            j += 1;
        } else if j >= m || (i < n && dp[(i + 1) * width + j] >= dp[i * width + j + 1]) {
            deletes.push(i);
            i += 1;
        } else {
            inserts.push(j);
            j += 1;
        }
    }
    flush_run(&mut ops, &mut deletes, &mut inserts);
    ops
}

fn flush_run(ops: &mut Vec<EditOp>, deletes: &mut Vec<usize>, inserts: &mut Vec<usize>) {
    let paired = deletes.len().min(inserts.len());
    ops.extend(
        deletes
            .iter()
            .zip(inserts.iter())
            .map(|(&i, &j)| EditOp::Replace(i, j)),
    );
    ops.extend(deletes[paired..].iter().map(|&i| EditOp::Delete(i)));
    ops.extend(inserts[paired..].iter().map(|&j| EditOp::Insert(j)));
    deletes.clear();
    inserts.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost(ops: &[EditOp]) -> usize {
        ops.iter().filter(|op| !matches!(op, EditOp::Equal(..))).count()
    }

    /// Every index of both sides appears exactly once, in order.
    fn assert_covers(ops: &[EditOp], n: usize, m: usize) {
        let mut seen_a = Vec::new();
        let mut seen_b = Vec::new();
        for op in ops {
            match *op {
                EditOp::Equal(i, j) | EditOp::Replace(i, j) => {
                    seen_a.push(i);
                    seen_b.push(j);
                }
                EditOp::Delete(i) => seen_a.push(i),
                EditOp::Insert(j) => seen_b.push(j),
            }
        }
        assert_eq!(seen_a, (0..n).collect::<Vec<_>>());
        assert_eq!(seen_b, (0..m).collect::<Vec<_>>());
    }

    #[test]
    fn test_identical_sequences() {
        let a = ["addiu", "sw", "jr"];
        let ops = levenshtein(&a, &a);
        assert_eq!(ops, vec![EditOp::Equal(0, 0), EditOp::Equal(1, 1), EditOp::Equal(2, 2)]);
        assert_eq!(lcs_diff(&a, &a), ops);
    }

    #[test]
    fn test_levenshtein_is_minimal() {
        let a = ["lui", "addiu", "jal", "nop", "jr"];
        let b = ["lui", "ori", "jal", "jr", "addiu"];
        let ops = levenshtein(&a, &b);
        assert_covers(&ops, a.len(), b.len());
        assert_eq!(cost(&ops), 3);
        assert_eq!(ops[1], EditOp::Replace(1, 1));
    }

    #[test]
    fn test_empty_sides() {
        let a = ["lw", "jr"];
        let empty: [&str; 0] = [];
        assert_eq!(levenshtein(&a, &empty), vec![EditOp::Delete(0), EditOp::Delete(1)]);
        assert_eq!(levenshtein(&empty, &a), vec![EditOp::Insert(0), EditOp::Insert(1)]);
        assert_eq!(lcs_diff(&a, &empty), vec![EditOp::Delete(0), EditOp::Delete(1)]);
        assert!(levenshtein(&empty, &empty).is_empty());
    }

    #[test]
    fn test_lcs_pairs_runs_as_replacements() {
        let a = ["lui", "addiu", "lw", "jr"];
        let b = ["lui", "ori", "jr"];
        let ops = lcs_diff(&a, &b);
        assert_covers(&ops, a.len(), b.len());
        assert_eq!(
            ops,
            vec![
                EditOp::Equal(0, 0),
                EditOp::Replace(1, 1),
                EditOp::Delete(2),
                EditOp::Equal(3, 2),
            ]
        );
    }
}
