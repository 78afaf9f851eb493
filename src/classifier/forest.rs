// Decision forest: node layout, load-time checks and evaluation.

use serde::Deserialize;

/// One node of a flattened tree. Children always sit at higher indices than their parent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct Forest {
    trees: Vec<Tree>,
    n_classes: usize,
}

impl Forest {
    /// Checks every tree against the feature and class counts and normalizes the leaves.
    /// Errors are human-readable descriptions of the first offending node.
    pub fn new(mut trees: Vec<Tree>, n_features: usize, n_classes: usize) -> Result<Self, String> {
        if trees.is_empty() {
            return Err("forest has no trees".into());
        }
        for (t, tree) in trees.iter_mut().enumerate() {
            validate_tree(tree, t, n_features, n_classes)?;
            for node in &mut tree.nodes {
                if let Node::Leaf { value } = node {
                    let sum: f64 = value.iter().sum();
                    value.iter_mut().for_each(|v| *v /= sum);
                }
            }
        }
        Ok(Self { trees, n_classes })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the per-tree leaf distributions reached by `x`.
    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut acc = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.leaf_for(x)) {
                *a += p;
            }
        }
        let n = self.trees.len() as f64;
        acc.iter_mut().for_each(|a| *a /= n);
        acc
    }
}

impl Tree {
    fn leaf_for(&self, x: &[f64]) -> &[f64] {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

fn validate_tree(tree: &Tree, t: usize, n_features: usize, n_classes: usize) -> Result<(), String> {
    if tree.nodes.is_empty() {
        return Err(format!("tree {} has no nodes", t));
    }
    let len = tree.nodes.len();
    for (i, node) in tree.nodes.iter().enumerate() {
        match node {
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= n_features {
                    return Err(format!(
                        "tree {} node {}: feature {} out of range ({} features)",
                        t, i, feature, n_features
                    ));
                }
                if !threshold.is_finite() {
                    return Err(format!("tree {} node {}: non-finite threshold", t, i));
                }
                for child in [*left, *right] {
                    if child <= i || child >= len {
                        return Err(format!(
                            "tree {} node {}: child {} must point forward inside the tree",
                            t, i, child
                        ));
                    }
                }
            }
            Node::Leaf { value } => {
                if value.len() != n_classes {
                    return Err(format!(
                        "tree {} node {}: leaf has {} values, expected {}",
                        t,
                        i,
                        value.len(),
                        n_classes
                    ));
                }
                if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(format!("tree {} node {}: leaf values must be finite and >= 0", t, i));
                }
                if value.iter().sum::<f64>() <= 0.0 {
                    return Err(format!("tree {} node {}: leaf sums to zero", t, i));
                }
            }
        }
    }
    Ok(())
}

/// Index of the largest probability; ties go to the lowest index.
pub fn argmax(p: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in p.iter().copied().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f64, left: Vec<f64>, right: Vec<f64>) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: left },
                Node::Leaf { value: right },
            ],
        }
    }

    #[test]
    fn goes_left_on_equal_threshold() {
        let f = Forest::new(vec![stump(5.0, vec![1.0, 0.0], vec![0.0, 1.0])], 1, 2).unwrap();
        assert_eq!(f.predict_proba(&[5.0]), vec![1.0, 0.0]);
        assert_eq!(f.predict_proba(&[5.1]), vec![0.0, 1.0]);
    }

    #[test]
    fn leaves_are_normalized_and_averaged() {
        let f = Forest::new(
            vec![
                stump(5.0, vec![3.0, 1.0], vec![0.0, 1.0]),
                stump(10.0, vec![0.0, 2.0], vec![1.0, 0.0]),
            ],
            1,
            2,
        )
        .unwrap();
        let p = f.predict_proba(&[1.0]);
        assert!((p[0] - 0.375).abs() < 1e-12);
        assert!((p[1] - 0.625).abs() < 1e-12);
    }

    #[test]
    fn argmax_tie_takes_first() {
        assert_eq!(argmax(&[0.25, 0.5, 0.5]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn rejects_backward_child() {
        let tree = Tree {
            nodes: vec![
                Node::Leaf { value: vec![1.0] },
                Node::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 0,
                },
            ],
        };
        let err = Forest::new(vec![tree], 1, 1).unwrap_err();
        assert!(err.contains("point forward"), "{}", err);
    }

    #[test]
    fn rejects_wrong_leaf_width() {
        let err = Forest::new(vec![stump(1.0, vec![1.0], vec![0.0, 1.0])], 1, 2).unwrap_err();
        assert!(err.contains("expected 2"), "{}", err);
    }

    #[test]
    fn rejects_feature_out_of_range() {
        let err = Forest::new(vec![stump(1.0, vec![1.0, 0.0], vec![0.0, 1.0])], 0, 2).unwrap_err();
        assert!(err.contains("out of range"), "{}", err);
    }
}
