//! Like markers shown beside the heatmap.

/// Ordered set of like timepoints. Equal values are stored once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerSet {
    points: Vec<f64>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `t`. Returns `false` if it was already present or not finite.
    pub fn add(&mut self, t: f64) -> bool {
        if !t.is_finite() {
            return false;
        }
        match self.points.binary_search_by(|p| p.total_cmp(&t)) {
            Ok(_) => false,
            Err(pos) => {
                self.points.insert(pos, t);
                true
            }
        }
    }

    pub fn contains(&self, t: f64) -> bool {
        self.points.binary_search_by(|p| p.total_cmp(&t)).is_ok()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Replace every marker with `likes`.
    pub fn replace_all(&mut self, likes: &[f64]) {
        self.points.clear();
        for t in likes {
            self.add(*t);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_dedupes_and_orders() {
        let mut markers = MarkerSet::new();
        assert!(markers.add(30.0));
        assert!(markers.add(10.0));
        assert!(!markers.add(30.0));
        assert!(markers.add(10.5));
        assert_eq!(markers.as_slice(), &[10.0, 10.5, 30.0]);
        assert!(markers.contains(10.5));
        assert!(!markers.contains(11.0));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut markers = MarkerSet::new();
        assert!(!markers.add(f64::NAN));
        assert!(!markers.add(f64::INFINITY));
        assert!(markers.is_empty());
    }

    #[test]
    fn test_replace_all() {
        let mut markers = MarkerSet::new();
        markers.add(1.0);
        markers.replace_all(&[5.0, 2.0, 5.0]);
        assert_eq!(markers.iter().collect::<Vec<_>>(), vec![2.0, 5.0]);
        markers.clear();
        assert_eq!(markers.len(), 0);
    }
}
