//! Compiled decision trees.
//!
//! Split features are stored as schema indices, so evaluation reads the
//! encoded row directly regardless of the artifact's column order.

use crate::ports::ModelError;

/// Relative tolerance for `cover(left) + cover(right) == cover(parent)`.
const COVER_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

impl Node {
    pub(crate) fn cover(&self) -> f64 {
        match self {
            Self::Split { cover, .. } | Self::Leaf { cover, .. } => *cover,
        }
    }
}

/// A validated binary tree. Node 0 is the root; children always follow their parent.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Validate structure and covers.
    ///
    /// # Errors
    /// Returns `ModelError::Format` describing the first defect found.
    pub(crate) fn new(nodes: Vec<Node>, n_features: usize) -> Result<Self, ModelError> {
        if nodes.is_empty() {
            return Err(ModelError::Format("tree has no nodes".into()));
        }

        for (i, node) in nodes.iter().enumerate() {
            let cover = node.cover();
            if !cover.is_finite() || cover <= 0.0 {
                return Err(ModelError::Format(format!(
                    "node {i}: cover must be positive, got {cover}"
                )));
            }

            match node {
                Node::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(ModelError::Format(format!("node {i}: leaf value is not finite")));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    cover,
                } => {
                    if *feature >= n_features {
                        return Err(ModelError::Format(format!(
                            "node {i}: split feature {feature} out of range"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(ModelError::Format(format!("node {i}: threshold is not finite")));
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= nodes.len() {
                            return Err(ModelError::Format(format!(
                                "node {i}: child index {child} invalid"
                            )));
                        }
                    }
                    if left == right {
                        return Err(ModelError::Format(format!("node {i}: both children are {left}")));
                    }
                    let children = nodes[*left].cover() + nodes[*right].cover();
                    if (children - cover).abs() > COVER_TOLERANCE * cover {
                        return Err(ModelError::Format(format!(
                            "node {i}: children cover {children} does not match node cover {cover}"
                        )));
                    }
                }
            }
        }

        Ok(Self { nodes })
    }

    pub(crate) fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Multiply every leaf value by `factor`.
    pub(crate) fn scale_leaves(&mut self, factor: f64) {
        for node in &mut self.nodes {
            if let Node::Leaf { value, .. } = node {
                *value *= factor;
            }
        }
    }

    /// Leaf value reached by `x`. `x[feature] <= threshold` goes left.
    pub(crate) fn predict(&self, x: &[f64]) -> f64 {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    i = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Cover-weighted mean leaf value, the tree's expected output.
    pub(crate) fn expected_value(&self) -> f64 {
        self.subtree_mean(0)
    }

    fn subtree_mean(&self, i: usize) -> f64 {
        match &self.nodes[i] {
            Node::Leaf { value, .. } => *value,
            Node::Split {
                left, right, cover, ..
            } => {
                let wl = self.nodes[*left].cover() / cover;
                let wr = self.nodes[*right].cover() / cover;
                wl * self.subtree_mean(*left) + wr * self.subtree_mean(*right)
            }
        }
    }

    /// Longest root-to-leaf path, in edges.
    pub(crate) fn max_depth(&self) -> usize {
        fn depth(tree: &Tree, i: usize) -> usize {
            match &tree.nodes[i] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth(tree, *left).max(depth(tree, *right)),
            }
        }
        depth(self, 0)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::stage_age_tree;
    use super::*;

    #[test]
    fn test_predict_follows_threshold() {
        let tree = stage_age_tree();
        let mut x = [0.0; 12];
        x[3] = 2.0;
        x[0] = 5.0;
        assert_eq!(tree.predict(&x), -0.4);
        x[0] = 6.0;
        assert_eq!(tree.predict(&x), -0.4);
        x[0] = 6.5;
        assert_eq!(tree.predict(&x), -0.1);
        x[3] = 5.0;
        assert_eq!(tree.predict(&x), 0.9);
    }

    #[test]
    fn test_expected_value_is_cover_weighted() {
        let tree = stage_age_tree();
        let expected = (30.0 * -0.4 + 40.0 * -0.1 + 20.0 * 0.3 + 10.0 * 0.9) / 100.0;
        assert!((tree.expected_value() - expected).abs() < 1e-12);
        assert_eq!(tree.max_depth(), 2);
    }

    #[test]
    fn test_rejects_inconsistent_cover() {
        let err = Tree::new(
            vec![
                Node::Split { feature: 0, threshold: 1.0, left: 1, right: 2, cover: 10.0 },
                Node::Leaf { value: 0.0, cover: 4.0 },
                Node::Leaf { value: 1.0, cover: 5.0 },
            ],
            12,
        )
        .expect_err("cover mismatch");
        assert!(err.to_string().contains("cover"));
    }

    #[test]
    fn test_rejects_backward_child() {
        let err = Tree::new(
            vec![
                Node::Split { feature: 0, threshold: 1.0, left: 0, right: 1, cover: 2.0 },
                Node::Leaf { value: 0.0, cover: 1.0 },
            ],
            12,
        )
        .expect_err("cycle");
        assert!(matches!(err, ModelError::Format(_)));
    }

    #[test]
    fn test_rejects_out_of_range_feature() {
        let err = Tree::new(
            vec![
                Node::Split { feature: 12, threshold: 1.0, left: 1, right: 2, cover: 2.0 },
                Node::Leaf { value: 0.0, cover: 1.0 },
                Node::Leaf { value: 0.0, cover: 1.0 },
            ],
            12,
        )
        .expect_err("feature out of range");
        assert!(err.to_string().contains("out of range"));
    }
}
