//! Static 2-D KD-tree over normalized coordinates.
//!
//! Built once in O(n log n) by recursive median selection, then queried by
//! box (`range`) or by radius (`within`). Query results are returned as the
//! indices of the input slice and come out in a deterministic order.

#[derive(Debug, Clone, Copy)]
struct Entry {
    index: usize,
    x: f64,
    y: f64,
}

impl Entry {
    fn coord(&self, axis: usize) -> f64 {
        if axis == 0 {
            self.x
        } else {
            self.y
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KdTree {
    node_size: usize,
    entries: Vec<Entry>,
}

fn build(entries: &mut [Entry], node_size: usize, axis: usize) {
    if entries.len() <= node_size {
        return;
    }
    let m = entries.len() / 2;
    entries.select_nth_unstable_by(m, |a, b| a.coord(axis).total_cmp(&b.coord(axis)));
    let (lo, rest) = entries.split_at_mut(m);
    build(lo, node_size, 1 - axis);
    build(&mut rest[1..], node_size, 1 - axis);
}

impl KdTree {
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>, node_size: usize) -> Self {
        let node_size = node_size.max(1);
        let mut entries: Vec<Entry> = points
            .into_iter()
            .enumerate()
            .map(|(index, (x, y))| Entry { index, x, y })
            .collect();
        build(&mut entries, node_size, 0);
        KdTree { node_size, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices of all points inside the inclusive box.
    pub fn range(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<usize> {
        let inside = |e: &Entry| e.x >= min_x && e.x <= max_x && e.y >= min_y && e.y <= max_y;
        self.search(inside, |axis, c| {
            let (lo, hi) = if axis == 0 { (min_x, max_x) } else { (min_y, max_y) };
            (lo <= c, hi >= c)
        })
    }

    /// Indices of all points within Euclidean distance `r` of `(x, y)`.
    pub fn within(&self, x: f64, y: f64, r: f64) -> Vec<usize> {
        let r2 = r * r;
        let inside = |e: &Entry| {
            let dx = e.x - x;
            let dy = e.y - y;
            dx * dx + dy * dy <= r2
        };
        self.search(inside, |axis, c| {
            let center = if axis == 0 { x } else { y };
            (center - r <= c, center + r >= c)
        })
    }

    /// Walk the implicit tree. `sides` reports whether the query reaches the
    /// lower and upper half for a split value on the given axis.
    fn search(
        &self,
        inside: impl Fn(&Entry) -> bool,
        sides: impl Fn(usize, f64) -> (bool, bool),
    ) -> Vec<usize> {
        let mut result = Vec::new();
        let mut stack = vec![(0usize, self.entries.len(), 0usize)];

        while let Some((left, right, axis)) = stack.pop() {
            if right - left <= self.node_size {
                result.extend(
                    self.entries[left..right]
                        .iter()
                        .filter(|e| inside(*e))
                        .map(|e| e.index),
                );
                continue;
            }

            let m = left + (right - left) / 2;
            let split = &self.entries[m];
            if inside(split) {
                result.push(split.index);
            }

            let (go_lo, go_hi) = sides(axis, split.coord(axis));
            if go_lo {
                stack.push((left, m, 1 - axis));
            }
            if go_hi {
                stack.push((m + 1, right, 1 - axis));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Vec<(f64, f64)> {
        let mut pts = Vec::new();
        for i in 0..n {
            for j in 0..n {
                pts.push((i as f64, j as f64));
            }
        }
        pts
    }

    fn brute_range(pts: &[(f64, f64)], min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<usize> {
        pts.iter()
            .enumerate()
            .filter(|(_, p)| p.0 >= min_x && p.0 <= max_x && p.1 >= min_y && p.1 <= max_y)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_range_matches_brute_force() {
        let pts = grid(30);
        let tree = KdTree::new(pts.iter().copied(), 8);
        let mut got = tree.range(3.5, 10.0, 12.0, 14.5);
        got.sort();
        assert_eq!(got, brute_range(&pts, 3.5, 10.0, 12.0, 14.5));
    }

    #[test]
    fn test_within_matches_brute_force() {
        let pts = grid(30);
        let tree = KdTree::new(pts.iter().copied(), 4);
        let mut got = tree.within(15.0, 15.0, 3.0);
        got.sort();
        let expected: Vec<usize> = pts
            .iter()
            .enumerate()
            .filter(|(_, p)| (p.0 - 15.0).powi(2) + (p.1 - 15.0).powi(2) <= 9.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::new(std::iter::empty(), 64);
        assert!(tree.is_empty());
        assert!(tree.range(0.0, 0.0, 1.0, 1.0).is_empty());
        assert!(tree.within(0.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_queries_are_deterministic() {
        let pts = grid(20);
        let a = KdTree::new(pts.iter().copied(), 4);
        let b = KdTree::new(pts.iter().copied(), 4);
        assert_eq!(a.within(7.0, 7.0, 4.0), b.within(7.0, 7.0, 4.0));
        assert_eq!(a.range(1.0, 1.0, 9.0, 9.0), a.range(1.0, 1.0, 9.0, 9.0));
    }
}
