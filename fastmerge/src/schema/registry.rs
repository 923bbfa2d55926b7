use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::{MergeOutcome, SchemaMismatch};
use crate::types::{Branch, BranchType, RowGroupKind};

/// How strictly branch provenance is compared across inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Every branch must carry the same single configuration id and lineage reference.
    #[default]
    Strict,
    /// Branch names must match; configuration ids and lineage are unioned.
    Permissive,
}

/// Mapping from branch name to branch descriptor, plus the row groups the schema declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    #[serde(default)]
    branches: BTreeMap<String, Branch>,
    #[serde(default)]
    row_groups: BTreeSet<RowGroupKind>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a branch, returning the registry for chaining.
    pub fn with_branch(mut self, branch: Branch) -> Self {
        self.branches.insert(branch.name.clone(), branch);
        self
    }

    /// Declares a row group, returning the registry for chaining.
    pub fn with_row_group(mut self, group: RowGroupKind) -> Self {
        self.row_groups.insert(group);
        self
    }

    /// Replaces the declared row groups.
    pub fn set_row_groups(&mut self, groups: impl IntoIterator<Item = RowGroupKind>) {
        self.row_groups = groups.into_iter().collect();
    }

    pub fn branch(&self, name: &str) -> Option<&Branch> {
        self.branches.get(name)
    }

    pub fn branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.values()
    }

    pub fn row_groups(&self) -> &BTreeSet<RowGroupKind> {
        &self.row_groups
    }

    pub fn has_row_group(&self, group: RowGroupKind) -> bool {
        self.row_groups.contains(&group)
    }

    /// Returns the sorted names of every branch of `branch_type`.
    pub fn branch_names(&self, branch_type: BranchType) -> Vec<String> {
        self.branches
            .values()
            .filter(|branch| branch.branch_type == branch_type)
            .map(|branch| branch.name.clone())
            .collect()
    }

    /// Checks the within-file invariant strict merges rely on.
    ///
    /// Every branch must carry exactly one configuration id and at most one lineage reference.
    pub fn check_strict_criteria(&self) -> Result<(), Vec<SchemaMismatch>> {
        let mut mismatches = Vec::new();

        for branch in self.branches.values() {
            if branch.configuration_ids.len() != 1 {
                mismatches.push(SchemaMismatch::ConfigurationIdCount {
                    branch: branch.name.clone(),
                    expected: 1,
                    actual: branch.configuration_ids.len(),
                });
            }
            if branch.lineage.len() > 1 {
                mismatches.push(SchemaMismatch::LineageCount {
                    branch: branch.name.clone(),
                    actual: branch.lineage.len(),
                });
            }
        }

        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(mismatches)
        }
    }

    /// Compares `candidate` against the registry without modifying it.
    pub fn compatible(
        &self,
        candidate: &SchemaRegistry,
        mode: MatchMode,
    ) -> Result<(), Vec<SchemaMismatch>> {
        let mut mismatches = Vec::new();

        for name in self.branches.keys() {
            if !candidate.branches.contains_key(name) {
                mismatches.push(SchemaMismatch::MissingBranch {
                    branch: name.clone(),
                });
            }
        }

        for (name, theirs) in &candidate.branches {
            let Some(ours) = self.branches.get(name) else {
                mismatches.push(SchemaMismatch::UnexpectedBranch {
                    branch: name.clone(),
                });
                continue;
            };

            if ours.branch_type != theirs.branch_type {
                mismatches.push(SchemaMismatch::BranchTypeDiffers {
                    branch: name.clone(),
                    expected: ours.branch_type,
                    actual: theirs.branch_type,
                });
                continue;
            }

            if mode == MatchMode::Strict {
                compare_strict(ours, theirs, &mut mismatches);
            }
        }

        for group in &self.row_groups {
            if !candidate.row_groups.contains(group) {
                mismatches.push(SchemaMismatch::MissingRowGroup { group: *group });
            }
        }

        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(mismatches)
        }
    }

    /// Merges `candidate` into the registry.
    ///
    /// Either the whole candidate is applied or, when any mismatch is found, nothing is. Under
    /// [`MatchMode::Permissive`] configuration ids and lineage are unioned per branch. Row groups
    /// the candidate adds extend the registry.
    pub fn merge(&mut self, candidate: &SchemaRegistry, mode: MatchMode) -> MergeOutcome {
        if let Err(mismatches) = self.compatible(candidate, mode) {
            return MergeOutcome::new(mismatches);
        }

        if mode == MatchMode::Permissive {
            for (name, theirs) in &candidate.branches {
                if let Some(ours) = self.branches.get_mut(name) {
                    ours.configuration_ids
                        .extend(theirs.configuration_ids.iter().cloned());
                    ours.lineage.extend(theirs.lineage.iter().cloned());
                }
            }
        }

        self.row_groups.extend(candidate.row_groups.iter().copied());

        MergeOutcome::default()
    }
}

fn compare_strict(ours: &Branch, theirs: &Branch, mismatches: &mut Vec<SchemaMismatch>) {
    if theirs.configuration_ids.len() != 1 {
        mismatches.push(SchemaMismatch::ConfigurationIdCount {
            branch: theirs.name.clone(),
            expected: 1,
            actual: theirs.configuration_ids.len(),
        });
    } else if ours.configuration_ids != theirs.configuration_ids {
        mismatches.push(SchemaMismatch::ConfigurationIdDiffers {
            branch: theirs.name.clone(),
        });
    }

    if theirs.lineage.len() > 1 {
        mismatches.push(SchemaMismatch::LineageCount {
            branch: theirs.name.clone(),
            actual: theirs.lineage.len(),
        });
    } else if ours.lineage != theirs.lineage {
        mismatches.push(SchemaMismatch::LineageDiffers {
            branch: theirs.name.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::ProvenanceId;

    fn id(hex: &str) -> ProvenanceId {
        ProvenanceId::from_hex(hex)
    }

    fn schema(config_for_x: &str) -> SchemaRegistry {
        SchemaRegistry::new()
            .with_branch(
                Branch::new("x", BranchType::Event).with_configuration_id(id(config_for_x)),
            )
            .with_branch(Branch::new("y", BranchType::Event).with_configuration_id(id("cc")))
            .with_branch(Branch::new("run_info", BranchType::Run).with_configuration_id(id("dd")))
            .with_row_group(RowGroupKind::Events)
    }

    #[test]
    fn test_identical_schemas_are_strictly_compatible() {
        let mut registry = schema("aa");

        let outcome = registry.merge(&schema("aa"), MatchMode::Strict);

        assert!(outcome.is_compatible());
        assert_eq!(outcome.diagnostic(), "");
        assert_eq!(registry, schema("aa"));
    }

    #[test]
    fn test_strict_rejects_differing_configuration_id() {
        let mut registry = schema("aa");

        let outcome = registry.merge(&schema("bb"), MatchMode::Strict);

        assert_eq!(outcome.mismatches(), &[SchemaMismatch::ConfigurationIdDiffers {
            branch: "x".to_string()
        }]);
        insta::assert_snapshot!(
            outcome.diagnostic(),
            @"branch `x` has a configuration id that differs from the reference"
        );
        assert_eq!(registry, schema("aa"));
    }

    #[test]
    fn test_permissive_unions_configuration_ids() {
        let mut registry = schema("aa");

        let outcome = registry.merge(&schema("bb"), MatchMode::Permissive);

        assert!(outcome.is_compatible());
        let x = registry.branch("x").unwrap();
        assert_eq!(x.configuration_ids.len(), 2);
        assert_eq!(registry.branch("y").unwrap().configuration_ids.len(), 1);
    }

    #[test]
    fn test_missing_and_unexpected_branches_fail_in_both_modes() {
        let registry = schema("aa");
        let candidate = SchemaRegistry::new()
            .with_branch(Branch::new("x", BranchType::Event).with_configuration_id(id("aa")))
            .with_branch(Branch::new("run_info", BranchType::Run).with_configuration_id(id("dd")))
            .with_branch(Branch::new("z", BranchType::Lumi).with_configuration_id(id("ee")))
            .with_row_group(RowGroupKind::Events);

        for mode in [MatchMode::Strict, MatchMode::Permissive] {
            let mismatches = registry.compatible(&candidate, mode).unwrap_err();
            assert_eq!(mismatches, vec![
                SchemaMismatch::MissingBranch {
                    branch: "y".to_string()
                },
                SchemaMismatch::UnexpectedBranch {
                    branch: "z".to_string()
                },
            ]);
        }
    }

    #[test]
    fn test_branch_type_must_match() {
        let registry = schema("aa");
        let candidate = schema("aa")
            .with_branch(Branch::new("y", BranchType::Lumi).with_configuration_id(id("cc")));

        let mismatches = registry
            .compatible(&candidate, MatchMode::Permissive)
            .unwrap_err();

        insta::assert_snapshot!(
            mismatches[0].to_string(),
            @"branch `y` is a Lumi branch, expected a Event branch"
        );
    }

    #[test]
    fn test_strict_rejects_multiple_configuration_ids_in_candidate() {
        let registry = schema("aa");
        let candidate = schema("aa").with_branch(
            Branch::new("y", BranchType::Event)
                .with_configuration_id(id("cc"))
                .with_configuration_id(id("c2")),
        );

        let mismatches = registry.compatible(&candidate, MatchMode::Strict).unwrap_err();

        assert_eq!(mismatches, vec![SchemaMismatch::ConfigurationIdCount {
            branch: "y".to_string(),
            expected: 1,
            actual: 2,
        }]);
    }

    #[test]
    fn test_strict_compares_lineage() {
        let registry = schema("aa")
            .with_branch(
                Branch::new("y", BranchType::Event)
                    .with_configuration_id(id("cc"))
                    .with_lineage(id("l1")),
            );
        let candidate = schema("aa")
            .with_branch(
                Branch::new("y", BranchType::Event)
                    .with_configuration_id(id("cc"))
                    .with_lineage(id("l2")),
            );

        let mismatches = registry.compatible(&candidate, MatchMode::Strict).unwrap_err();
        assert_eq!(mismatches, vec![SchemaMismatch::LineageDiffers {
            branch: "y".to_string()
        }]);

        assert!(registry.compatible(&candidate, MatchMode::Permissive).is_ok());
    }

    #[test]
    fn test_missing_row_group_is_a_mismatch_and_new_groups_extend() {
        let mut registry = schema("aa").with_row_group(RowGroupKind::Runs);

        let outcome = registry.merge(&schema("aa"), MatchMode::Strict);
        assert_eq!(outcome.mismatches(), &[SchemaMismatch::MissingRowGroup {
            group: RowGroupKind::Runs
        }]);

        let extended = schema("aa")
            .with_row_group(RowGroupKind::Runs)
            .with_row_group(RowGroupKind::Lumis);
        assert!(registry.merge(&extended, MatchMode::Strict).is_compatible());
        assert!(registry.has_row_group(RowGroupKind::Lumis));
    }

    #[test]
    fn test_strict_criteria_on_seed_schema() {
        let valid = schema("aa");
        assert!(valid.check_strict_criteria().is_ok());

        let invalid = schema("aa").with_branch(Branch::new("y", BranchType::Event));
        assert_eq!(invalid.check_strict_criteria().unwrap_err(), vec![
            SchemaMismatch::ConfigurationIdCount {
                branch: "y".to_string(),
                expected: 1,
                actual: 0,
            }
        ]);
    }

    #[test]
    fn test_branch_names_filter_by_type() {
        assert_eq!(schema("aa").branch_names(BranchType::Event), vec![
            "x".to_string(),
            "y".to_string()
        ]);
    }
}
