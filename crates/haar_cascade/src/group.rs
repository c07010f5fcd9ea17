//! Merging of overlapping candidate windows.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// Two rects are similar when every edge moves by at most `delta`, where
/// `delta = eps * (min widths + min heights) / 2`.
fn similar(a: &Rect, b: &Rect, eps: f64) -> bool {
    let delta =
        eps * (a.width.min(b.width) as f64 + a.height.min(b.height) as f64) * 0.5;
    ((a.x - b.x).abs() as f64) <= delta
        && ((a.y - b.y).abs() as f64) <= delta
        && ((a.right() - b.right()).abs() as f64) <= delta
        && ((a.bottom() - b.bottom()).abs() as f64) <= delta
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Label rects into equivalence classes of the transitive `similar` relation.
/// Labels are numbered by first appearance.
fn partition(rects: &[Rect], eps: f64) -> (Vec<usize>, usize) {
    let n = rects.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if similar(&rects[i], &rects[j], eps) {
                let (ri, rj) = (find_root(&mut parent, i), find_root(&mut parent, j));
                if ri != rj {
                    parent[rj.max(ri)] = rj.min(ri);
                }
            }
        }
    }
    let mut root_label = vec![usize::MAX; n];
    let mut labels = Vec::with_capacity(n);
    let mut classes = 0;
    for i in 0..n {
        let root = find_root(&mut parent, i);
        if root_label[root] == usize::MAX {
            root_label[root] = classes;
            classes += 1;
        }
        labels.push(root_label[root]);
    }
    (labels, classes)
}

/// Cluster candidate windows and average each cluster.
///
/// Clusters with `<= group_threshold` members are dropped, as are clusters
/// lying inside a stronger cluster. Returns each surviving rect with its
/// member count. A `group_threshold` of zero returns the input unchanged.
pub fn group_rectangles(rects: &[Rect], group_threshold: u32, eps: f64) -> Vec<(Rect, u32)> {
    if group_threshold == 0 || rects.is_empty() {
        return rects.iter().map(|r| (*r, 1)).collect();
    }
    let (labels, classes) = partition(rects, eps);

    let mut acc = vec![[0i64; 4]; classes];
    let mut weights = vec![0u32; classes];
    for (r, &label) in rects.iter().zip(&labels) {
        acc[label][0] += r.x as i64;
        acc[label][1] += r.y as i64;
        acc[label][2] += r.width as i64;
        acc[label][3] += r.height as i64;
        weights[label] += 1;
    }
    let averaged: Vec<Rect> = acc
        .iter()
        .zip(&weights)
        .map(|(a, &n)| {
            let s = 1.0 / n as f64;
            Rect::new(
                (a[0] as f64 * s).round() as i32,
                (a[1] as f64 * s).round() as i32,
                (a[2] as f64 * s).round() as i32,
                (a[3] as f64 * s).round() as i32,
            )
        })
        .collect();

    let mut out = Vec::new();
    for i in 0..classes {
        let r1 = averaged[i];
        let n1 = weights[i];
        if n1 <= group_threshold {
            continue;
        }
        let nested = (0..classes).any(|j| {
            let n2 = weights[j];
            if j == i || n2 <= group_threshold {
                return false;
            }
            let r2 = averaged[j];
            let dx = (r2.width as f64 * eps).round() as i32;
            let dy = (r2.height as f64 * eps).round() as i32;
            r1.x >= r2.x - dx
                && r1.y >= r2.y - dy
                && r1.right() <= r2.right() + dx
                && r1.bottom() <= r2.bottom() + dy
                && (n2 > n1.max(3) || n1 < 3)
        });
        if !nested {
            out.push((r1, n1));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threshold_passes_through() {
        let rects = vec![Rect::new(0, 0, 10, 10), Rect::new(50, 50, 10, 10)];
        let out = group_rectangles(&rects, 0, 0.2);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|(_, n)| *n == 1));
    }

    #[test]
    fn clusters_are_averaged_and_thresholded() {
        let rects = vec![
            Rect::new(10, 10, 20, 20),
            Rect::new(11, 10, 20, 20),
            Rect::new(12, 11, 20, 20),
            Rect::new(10, 12, 20, 20),
            // lone false positive far away
            Rect::new(100, 100, 20, 20),
        ];
        let out = group_rectangles(&rects, 3, 0.2);
        assert_eq!(out, vec![(Rect::new(11, 11, 20, 20), 4)]);
    }

    #[test]
    fn similarity_is_transitive() {
        // a~b and b~c but a and c are not directly similar.
        let rects = vec![
            Rect::new(0, 0, 20, 20),
            Rect::new(4, 0, 20, 20),
            Rect::new(8, 0, 20, 20),
        ];
        assert!(!similar(&rects[0], &rects[2], 0.2));
        let out = group_rectangles(&rects, 1, 0.2);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1, 3);
        assert_eq!(out[0].0, Rect::new(4, 0, 20, 20));
    }

    #[test]
    fn weaker_nested_cluster_is_dropped() {
        let mut rects = Vec::new();
        for _ in 0..6 {
            rects.push(Rect::new(0, 0, 100, 100));
        }
        for _ in 0..2 {
            rects.push(Rect::new(30, 30, 20, 20));
        }
        let out = group_rectangles(&rects, 1, 0.2);
        assert_eq!(out, vec![(Rect::new(0, 0, 100, 100), 6)]);
    }
}
