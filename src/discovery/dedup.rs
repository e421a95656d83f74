use tracing::{debug, info, warn};

use super::types::ResolvedInstance;
use crate::error::{PilotError, PilotResult};

/// Why an instance was dropped during deduplication
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    InvalidLogPath,
    DuplicateOf { path: String },
}

/// Outcome of one deduplication pass
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub kept: Vec<ResolvedInstance>,
    pub excluded: Vec<(ResolvedInstance, Exclusion)>,
    /// One entry per input position; `None` means kept. Identical records
    /// (same host listed twice) are told apart only by position.
    pub decisions: Vec<Option<Exclusion>>,
}

impl DedupOutcome {
    pub fn is_kept(&self, position: usize) -> bool {
        matches!(self.decisions.get(position), Some(None))
    }

    pub fn exclusion(&self, position: usize) -> Option<&Exclusion> {
        self.decisions.get(position).and_then(Option::as_ref)
    }
}

/// Collapse instances that report the same log directory into the first one
/// listed, and drop instances without a usable path. Order of the kept
/// instances is the input order. An empty result is fatal.
pub fn deduplicate(pairs: Vec<ResolvedInstance>) -> PilotResult<Vec<ResolvedInstance>> {
    deduplicate_with_report(pairs).map(|outcome| outcome.kept)
}

pub fn deduplicate_with_report(pairs: Vec<ResolvedInstance>) -> PilotResult<DedupOutcome> {
    let mut seen_paths: Vec<String> = Vec::new();
    let mut reasons: Vec<Option<Exclusion>> = Vec::with_capacity(pairs.len());

    for pair in &pairs {
        let reason = match pair.log_path.as_deref() {
            Some(path) if pair.has_valid_log_path => {
                if seen_paths.iter().any(|seen| seen == path) {
                    Some(Exclusion::DuplicateOf {
                        path: path.to_string(),
                    })
                } else {
                    seen_paths.push(path.to_string());
                    None
                }
            }
            _ => Some(Exclusion::InvalidLogPath),
        };

        match &reason {
            Some(Exclusion::InvalidLogPath) => {
                warn!("Excluding {}: no usable log path", pair.instance.full_name);
            }
            Some(Exclusion::DuplicateOf { path }) => {
                debug!(
                    "Excluding {}: log path {} already monitored by an earlier instance",
                    pair.instance.full_name, path
                );
            }
            None => {}
        }
        reasons.push(reason);
    }

    let mut kept = Vec::new();
    let mut excluded = Vec::new();
    for (pair, reason) in pairs.into_iter().zip(reasons.iter().cloned()) {
        match reason {
            Some(reason) => excluded.push((pair, reason)),
            None => kept.push(pair),
        }
    }

    if kept.is_empty() {
        return Err(PilotError::NoUsableInstances);
    }

    info!(
        "{} instance(s) kept for monitoring, {} excluded",
        kept.len(),
        excluded.len()
    );
    Ok(DedupOutcome {
        kept,
        excluded,
        decisions: reasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::types::{full_name, InstanceRecord};
    use std::collections::{BTreeSet, HashSet};

    fn resolved(name: &str, path: Option<&str>) -> ResolvedInstance {
        ResolvedInstance::new(
            InstanceRecord {
                computer_name: "SQLHOST01".to_string(),
                instance_name: name.to_string(),
                full_name: full_name("SQLHOST01", name),
                edition: None,
                version: None,
                caption: "Unknown".to_string(),
                is_cluster: false,
                cluster_name: None,
                cluster_nodes: BTreeSet::new(),
                is_cluster_node: false,
            },
            path.map(String::from),
        )
    }

    fn names(pairs: &[ResolvedInstance]) -> Vec<&str> {
        pairs.iter().map(|p| p.name()).collect()
    }

    fn assert_unique_paths(pairs: &[ResolvedInstance]) {
        let mut seen = HashSet::new();
        for pair in pairs {
            assert!(seen.insert(pair.log_path.clone()), "duplicate path {:?}", pair.log_path);
        }
    }

    #[test]
    fn test_first_seen_wins() {
        let kept = deduplicate(vec![
            resolved("MSSQLSERVER", Some("D:\\Log1")),
            resolved("INST2", Some("D:\\Log1")),
            resolved("INST3", Some("D:\\Log2")),
        ])
        .unwrap();

        assert_eq!(names(&kept), vec!["MSSQLSERVER", "INST3"]);
        assert_unique_paths(&kept);
    }

    #[test]
    fn test_order_is_preserved() {
        let kept = deduplicate(vec![
            resolved("C", Some("D:\\C")),
            resolved("A", Some("D:\\A")),
            resolved("B", Some("D:\\B")),
            resolved("A2", Some("D:\\A")),
        ])
        .unwrap();

        assert_eq!(names(&kept), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_invalid_never_kept() {
        let mut invalid = resolved("INST2", Some("D:\\Log2"));
        invalid.has_valid_log_path = false;

        let kept = deduplicate(vec![
            invalid,
            resolved("INST3", None),
            resolved("INST4", Some("Log")),
            resolved("MSSQLSERVER", Some("D:\\Log1")),
        ])
        .unwrap();

        assert_eq!(names(&kept), vec!["MSSQLSERVER"]);
    }

    #[test]
    fn test_invalid_entry_does_not_claim_its_path() {
        let mut invalid = resolved("INST2", Some("D:\\Log1"));
        invalid.has_valid_log_path = false;

        let kept = deduplicate(vec![invalid, resolved("INST3", Some("D:\\Log1"))]).unwrap();
        assert_eq!(names(&kept), vec!["INST3"]);
    }

    #[test]
    fn test_all_equal_paths_keep_first() {
        let kept = deduplicate(vec![
            resolved("INST3", None),
            resolved("INST1", Some("E:\\Log")),
            resolved("INST2", Some("E:\\Log")),
            resolved("MSSQLSERVER", Some("E:\\Log")),
        ])
        .unwrap();

        assert_eq!(names(&kept), vec!["INST1"]);
    }

    #[test]
    fn test_path_comparison_is_case_sensitive() {
        let kept = deduplicate(vec![
            resolved("INST1", Some("D:\\Log")),
            resolved("INST2", Some("d:\\log")),
        ])
        .unwrap();

        assert_eq!(names(&kept), vec!["INST1", "INST2"]);
    }

    #[test]
    fn test_all_invalid_is_fatal() {
        let result = deduplicate(vec![resolved("MSSQLSERVER", None), resolved("INST2", Some(""))]);
        assert!(matches!(result, Err(PilotError::NoUsableInstances)));
    }

    #[test]
    fn test_empty_input_is_fatal() {
        assert!(matches!(deduplicate(Vec::new()), Err(PilotError::NoUsableInstances)));
    }

    #[test]
    fn test_report_lists_exclusion_reasons() {
        let outcome = deduplicate_with_report(vec![
            resolved("MSSQLSERVER", Some("D:\\Log1")),
            resolved("INST2", Some("D:\\Log1")),
            resolved("INST3", None),
        ])
        .unwrap();

        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.excluded.len(), 2);
        assert_eq!(
            outcome.excluded[0].1,
            Exclusion::DuplicateOf {
                path: "D:\\Log1".to_string()
            }
        );
        assert_eq!(outcome.excluded[1].1, Exclusion::InvalidLogPath);
    }

    #[test]
    fn test_mixed_sequences_never_keep_duplicate_paths() {
        let paths = [Some("D:\\A"), Some("D:\\B"), None, Some("D:\\A"), Some("X"), Some("D:\\B"), Some("D:\\C")];
        for start in 0..paths.len() {
            let input: Vec<ResolvedInstance> = paths
                .iter()
                .cycle()
                .skip(start)
                .take(paths.len())
                .enumerate()
                .map(|(i, p)| resolved(&format!("INST{}", i), *p))
                .collect();

            let kept = deduplicate(input.clone()).unwrap();
            assert_unique_paths(&kept);
            assert!(kept.iter().all(|k| k.has_valid_log_path));

            // kept entries appear in input order
            let positions: Vec<usize> = kept
                .iter()
                .map(|k| input.iter().position(|i| i.name() == k.name()).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_identical_records_are_decided_by_position() {
        let same = resolved("MSSQLSERVER", Some("D:\\Log1"));
        let outcome = deduplicate_with_report(vec![same.clone(), same, resolved("INST9", None)]).unwrap();

        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.decisions.len(), 3);
        assert!(outcome.is_kept(0));
        assert!(!outcome.is_kept(1));
        assert!(!outcome.is_kept(2));
        assert!(!outcome.is_kept(3));
        assert_eq!(
            outcome.exclusion(1),
            Some(&Exclusion::DuplicateOf {
                path: "D:\\Log1".to_string()
            })
        );
        assert_eq!(outcome.exclusion(2), Some(&Exclusion::InvalidLogPath));
    }
}
