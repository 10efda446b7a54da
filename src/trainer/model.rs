//! Declarative model artifacts produced by the training service.
//!
//! Trees use a flat node array rooted at index 0. A split sends the sample to
//! `left` when `features[feature] <= threshold` and to `right` otherwise.
//! Children always have a larger index than their parent, so every walk
//! terminates.

use crate::trainer::{Predictor, TrainingError, TrainingRequest, NO_PREDICTION};
use serde::{Deserialize, Serialize};

/// A trained classifier in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

/// A node of a decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        class: usize,
    },
}

/// A single decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub n_features: usize,
    pub n_classes: usize,
    pub nodes: Vec<TreeNode>,
}

/// An ensemble of trees voting on the label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

impl ModelArtifact {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ModelArtifact::DecisionTree(_) => "decision_tree",
            ModelArtifact::RandomForest(_) => "random_forest",
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            ModelArtifact::DecisionTree(tree) => tree.n_features,
            ModelArtifact::RandomForest(forest) => forest.n_features,
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            ModelArtifact::DecisionTree(tree) => tree.n_classes,
            ModelArtifact::RandomForest(forest) => forest.n_classes,
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), TrainingError> {
        match self {
            ModelArtifact::DecisionTree(tree) => tree.validate(),
            ModelArtifact::RandomForest(forest) => forest.validate(),
        }
    }

    /// Validate the artifact against the request it was trained for and
    /// turn it into a predictor.
    pub fn into_predictor_for(
        self,
        request: &TrainingRequest,
    ) -> Result<Box<dyn Predictor>, TrainingError> {
        self.validate()?;

        if self.n_features() != request.sensors.len() {
            return Err(TrainingError::InvalidArtifact(format!(
                "model expects {} features, {} sensors configured",
                self.n_features(),
                request.sensors.len()
            )));
        }
        if self.n_classes() > request.labels.len() {
            tracing::warn!(
                "Model knows {} classes but only {} labels are configured",
                self.n_classes(),
                request.labels.len()
            );
        }

        let predictor: Box<dyn Predictor> = match self {
            ModelArtifact::DecisionTree(tree) => Box::new(tree),
            ModelArtifact::RandomForest(forest) => Box::new(forest),
        };
        Ok(predictor)
    }
}

impl DecisionTree {
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.nodes.is_empty() {
            return Err(TrainingError::InvalidArtifact("tree has no nodes".into()));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= self.n_features {
                        return Err(TrainingError::InvalidArtifact(format!(
                            "node {index} splits on feature {feature} of {}",
                            self.n_features
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(TrainingError::InvalidArtifact(format!(
                            "node {index} has a non-finite threshold"
                        )));
                    }
                    for child in [left, right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(TrainingError::InvalidArtifact(format!(
                                "node {index} points to invalid child {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { class } => {
                    if class >= self.n_classes {
                        return Err(TrainingError::InvalidArtifact(format!(
                            "leaf {index} predicts class {class} of {}",
                            self.n_classes
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Walk the tree; `None` if the input does not fit the model.
    fn classify(&self, features: &[f64]) -> Option<usize> {
        if features.len() != self.n_features || features.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let mut index = 0;
        loop {
            match *self.nodes.get(index)? {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[feature] <= threshold {
                        left
                    } else {
                        right
                    };
                }
                TreeNode::Leaf { class } => return Some(class),
            }
        }
    }
}

impl Predictor for DecisionTree {
    fn predict(&self, features: &[f64]) -> i64 {
        self.classify(features)
            .map(|class| class as i64)
            .unwrap_or(NO_PREDICTION)
    }
}

impl RandomForest {
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.trees.is_empty() {
            return Err(TrainingError::InvalidArtifact("forest has no trees".into()));
        }

        for (index, tree) in self.trees.iter().enumerate() {
            if tree.n_features != self.n_features || tree.n_classes != self.n_classes {
                return Err(TrainingError::InvalidArtifact(format!(
                    "tree {index} does not match the forest shape"
                )));
            }
            tree.validate()?;
        }

        Ok(())
    }
}

impl Predictor for RandomForest {
    /// Majority vote; ties go to the lowest class index.
    fn predict(&self, features: &[f64]) -> i64 {
        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            match tree.classify(features) {
                Some(class) => votes[class] += 1,
                None => return NO_PREDICTION,
            }
        }

        let mut best = 0;
        for (class, &count) in votes.iter().enumerate() {
            if count > votes[best] {
                best = class;
            }
        }
        best as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// x <= 0.5 → class 0, else y <= 2.0 → class 1, else class 2
    fn tree() -> DecisionTree {
        DecisionTree {
            n_features: 2,
            n_classes: 3,
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { class: 0 },
                TreeNode::Split {
                    feature: 1,
                    threshold: 2.0,
                    left: 3,
                    right: 4,
                },
                TreeNode::Leaf { class: 1 },
                TreeNode::Leaf { class: 2 },
            ],
        }
    }

    fn leaf(n_classes: usize, class: usize) -> DecisionTree {
        DecisionTree {
            n_features: 2,
            n_classes,
            nodes: vec![TreeNode::Leaf { class }],
        }
    }

    #[test]
    fn test_tree_walk() {
        let tree = tree();
        tree.validate().unwrap();
        assert_eq!(tree.predict(&[0.5, 10.0]), 0);
        assert_eq!(tree.predict(&[0.6, 2.0]), 1);
        assert_eq!(tree.predict(&[0.6, 2.1]), 2);
    }

    #[test]
    fn test_bad_input_yields_sentinel() {
        let tree = tree();
        assert_eq!(tree.predict(&[1.0]), NO_PREDICTION);
        assert_eq!(tree.predict(&[f64::NAN, 1.0]), NO_PREDICTION);
    }

    #[test]
    fn test_invalid_trees_rejected() {
        let mut cyclic = tree();
        cyclic.nodes[2] = TreeNode::Split {
            feature: 0,
            threshold: 1.0,
            left: 0,
            right: 4,
        };
        assert!(cyclic.validate().is_err());

        let mut bad_feature = tree();
        bad_feature.nodes[0] = TreeNode::Split {
            feature: 5,
            threshold: 1.0,
            left: 1,
            right: 2,
        };
        assert!(bad_feature.validate().is_err());

        assert!(leaf(2, 2).validate().is_err());
    }

    #[test]
    fn test_forest_majority_vote() {
        let forest = RandomForest {
            n_features: 2,
            n_classes: 3,
            trees: vec![leaf(3, 2), leaf(3, 1), leaf(3, 2)],
        };
        forest.validate().unwrap();
        assert_eq!(forest.predict(&[0.0, 0.0]), 2);

        let tied = RandomForest {
            n_features: 2,
            n_classes: 3,
            trees: vec![leaf(3, 2), leaf(3, 1)],
        };
        assert_eq!(tied.predict(&[0.0, 0.0]), 1);
        assert_eq!(tied.predict(&[0.0]), NO_PREDICTION);
    }

    #[test]
    fn test_artifact_json() {
        let json = r#"{
            "kind": "decision_tree",
            "n_features": 2,
            "n_classes": 3,
            "nodes": [
                {"type": "split", "feature": 0, "threshold": 0.5, "left": 1, "right": 2},
                {"type": "leaf", "class": 0},
                {"type": "leaf", "class": 1}
            ]
        }"#;
        let artifact: ModelArtifact = serde_json::from_str(json).unwrap();
        assert_eq!(artifact.kind_name(), "decision_tree");
        assert_eq!(artifact.n_features(), 2);
        artifact.validate().unwrap();
    }

    #[test]
    fn test_feature_count_must_match_sensors() {
        let request = TrainingRequest {
            server: "http://localhost".into(),
            measurement: "devicemotion".into(),
            sensors: vec!["a".into(), "b".into(), "c".into()],
            labels: vec!["x".into(), "y".into(), "z".into()],
            preprocessor: None,
            classifier: "DecisionTreeClassifier".into(),
            hyperparameters: Default::default(),
        };

        let err = ModelArtifact::DecisionTree(tree())
            .into_predictor_for(&request)
            .err()
            .unwrap();
        assert!(matches!(err, TrainingError::InvalidArtifact(_)));

        let request = TrainingRequest {
            sensors: vec!["a".into(), "b".into()],
            ..request
        };
        let predictor = ModelArtifact::DecisionTree(tree())
            .into_predictor_for(&request)
            .unwrap();
        assert_eq!(predictor.predict(&[0.0, 0.0]), 0);
    }
}
