//! Resolves damper/duct distance candidates into a final mapping.

use crate::core::geometry::distance_to_duct;
use crate::domain::model::{
    Assignment, AssignmentPolicy, AssociationSettings, Candidate, Damper, Duct, Mapping,
};
use std::cmp::Ordering;

/// Every (damper, duct) pair that intersects the duct (possibly via extension)
/// within `distance_threshold`, in damper-major, duct-minor input order.
pub fn build_candidates(
    dampers: &[Damper],
    ducts: &[Duct],
    settings: &AssociationSettings,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for (damper_idx, damper) in dampers.iter().enumerate() {
        for (duct_idx, duct) in ducts.iter().enumerate() {
            let Some(measured) =
                distance_to_duct(damper.location, duct, settings.extension_distance)
            else {
                continue;
            };

            if measured.distance <= settings.distance_threshold {
                candidates.push(Candidate {
                    damper_idx,
                    duct_idx,
                    distance: measured.distance,
                    intersection: measured.intersection,
                });
            }
        }
    }

    candidates
}

/// Actual intersections outrank extended ones regardless of distance.
fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    a.intersection
        .priority()
        .cmp(&b.intersection.priority())
        .then_with(|| a.distance.total_cmp(&b.distance))
}

fn unassigned_mapping(dampers: &[Damper]) -> Mapping {
    dampers
        .iter()
        .map(|d| (d.id.clone(), Assignment::Unassigned))
        .collect()
}

/// Greedy one-to-one assignment: best-ranked candidates claim their duct
/// first; a duct is consumed by at most one damper and a damper keeps its
/// first assignment.
pub fn resolve_exclusive(dampers: &[Damper], ducts: &[Duct], candidates: &[Candidate]) -> Mapping {
    let mut ranked = candidates.to_vec();
    // sort_by 為穩定排序，同分時保留輸入順序
    ranked.sort_by(rank);

    let mut duct_used = vec![false; ducts.len()];
    let mut damper_done = vec![false; dampers.len()];
    let mut mapping = unassigned_mapping(dampers);

    for candidate in &ranked {
        if duct_used[candidate.duct_idx] || damper_done[candidate.damper_idx] {
            continue;
        }
        duct_used[candidate.duct_idx] = true;
        damper_done[candidate.damper_idx] = true;
        mapping.insert(
            dampers[candidate.damper_idx].id.clone(),
            Assignment::Duct(ducts[candidate.duct_idx].id.clone()),
        );
    }

    mapping
}

/// Independent nearest-duct choice per damper; ducts may be shared.
pub fn resolve_shared(dampers: &[Damper], ducts: &[Duct], candidates: &[Candidate]) -> Mapping {
    let mut best: Vec<Option<&Candidate>> = vec![None; dampers.len()];

    for candidate in candidates {
        let slot = &mut best[candidate.damper_idx];
        // 需嚴格優於目前最佳才替換
        if slot.map_or(true, |current| rank(candidate, current) == Ordering::Less) {
            *slot = Some(candidate);
        }
    }

    let mut mapping = unassigned_mapping(dampers);
    for (damper, chosen) in dampers.iter().zip(best) {
        if let Some(candidate) = chosen {
            mapping.insert(
                damper.id.clone(),
                Assignment::Duct(ducts[candidate.duct_idx].id.clone()),
            );
        }
    }

    mapping
}

pub fn resolve(
    policy: AssignmentPolicy,
    dampers: &[Damper],
    ducts: &[Duct],
    candidates: &[Candidate],
) -> Mapping {
    match policy {
        AssignmentPolicy::Exclusive => resolve_exclusive(dampers, ducts, candidates),
        AssignmentPolicy::Shared => resolve_shared(dampers, ducts, candidates),
    }
}

/// Full association: candidate generation followed by the configured policy.
pub fn associate(ducts: &[Duct], dampers: &[Damper], settings: &AssociationSettings) -> Mapping {
    let candidates = build_candidates(dampers, ducts, settings);
    tracing::debug!(
        "{} candidate pairs for {} dampers x {} ducts",
        candidates.len(),
        dampers.len(),
        ducts.len()
    );
    resolve(settings.policy, dampers, ducts, &candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Intersection, Point};

    fn vertical_duct(id: &str, x: f64) -> Duct {
        Duct::new(id, vec![Point::new(x, -5.0), Point::new(x, 5.0)])
    }

    fn settings(policy: AssignmentPolicy) -> AssociationSettings {
        AssociationSettings {
            policy,
            ..AssociationSettings::default()
        }
    }

    #[test]
    fn test_single_damper_on_duct() {
        let ducts = vec![vertical_duct("duct", 0.0)];
        let dampers = vec![Damper::new("damper", Point::new(0.0, 0.0))];

        let candidates = build_candidates(&dampers, &ducts, &AssociationSettings::default());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].intersection, Intersection::Actual);
        assert_eq!(candidates[0].distance, 0.0);

        let mapping = associate(&ducts, &dampers, &AssociationSettings::default());
        assert_eq!(mapping["damper"], Assignment::Duct("duct".to_string()));
    }

    #[test]
    fn test_beyond_extension_is_unassigned() {
        let ducts = vec![vertical_duct("duct", 0.0)];
        let dampers = vec![Damper::new("damper", Point::new(0.0, 20.0))];

        assert!(build_candidates(&dampers, &ducts, &AssociationSettings::default()).is_empty());
        let mapping = associate(&ducts, &dampers, &AssociationSettings::default());
        assert_eq!(mapping["damper"], Assignment::Unassigned);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let ducts = vec![vertical_duct("duct", 0.0)];
        let dampers = vec![
            Damper::new("at", Point::new(13.0, 0.0)),
            Damper::new("past", Point::new(13.5, 0.0)),
        ];
        let mapping = associate(&ducts, &dampers, &settings(AssignmentPolicy::Shared));
        assert!(mapping["at"].is_assigned());
        assert_eq!(mapping["past"], Assignment::Unassigned);
    }

    #[test]
    fn test_exclusive_gives_duct_to_closer_damper() {
        let ducts = vec![vertical_duct("duct", 0.0)];
        let dampers = vec![
            Damper::new("far", Point::new(6.0, 0.0)),
            Damper::new("near", Point::new(2.0, 0.0)),
        ];

        let mapping = associate(&ducts, &dampers, &settings(AssignmentPolicy::Exclusive));
        assert_eq!(mapping["near"], Assignment::Duct("duct".to_string()));
        assert_eq!(mapping["far"], Assignment::Unassigned);
    }

    #[test]
    fn test_actual_outranks_closer_extended() {
        let ducts = vec![vertical_duct("duct", 0.0)];
        // "beyond" 投影在延伸段上距離 0；"beside" 投影在原線段上距離 4
        let dampers = vec![
            Damper::new("beyond", Point::new(0.0, 8.0)),
            Damper::new("beside", Point::new(4.0, 0.0)),
        ];

        let candidates = build_candidates(&dampers, &ducts, &AssociationSettings::default());
        assert_eq!(candidates[0].intersection, Intersection::Extended);
        assert_eq!(candidates[1].intersection, Intersection::Actual);

        let mapping = associate(&ducts, &dampers, &settings(AssignmentPolicy::Exclusive));
        assert_eq!(mapping["beside"], Assignment::Duct("duct".to_string()));
        assert_eq!(mapping["beyond"], Assignment::Unassigned);
    }

    #[test]
    fn test_exclusive_damper_keeps_first_assignment() {
        let ducts = vec![vertical_duct("a", 0.0), vertical_duct("b", 3.0)];
        let dampers = vec![Damper::new("only", Point::new(1.0, 0.0))];

        let mapping = associate(&ducts, &dampers, &settings(AssignmentPolicy::Exclusive));
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["only"], Assignment::Duct("a".to_string()));
    }

    #[test]
    fn test_exclusive_displaced_damper_falls_back_to_next_duct() {
        let ducts = vec![vertical_duct("a", 0.0), vertical_duct("b", 10.0)];
        let dampers = vec![
            Damper::new("first", Point::new(1.0, 0.0)),
            Damper::new("second", Point::new(2.0, 0.0)),
        ];

        let mapping = associate(&ducts, &dampers, &settings(AssignmentPolicy::Exclusive));
        assert_eq!(mapping["first"], Assignment::Duct("a".to_string()));
        assert_eq!(mapping["second"], Assignment::Duct("b".to_string()));
    }

    #[test]
    fn test_shared_allows_duct_reuse() {
        let ducts = vec![vertical_duct("duct", 0.0)];
        let dampers = vec![
            Damper::new("left", Point::new(-2.0, 0.0)),
            Damper::new("right", Point::new(3.0, 0.0)),
        ];

        let mapping = associate(&ducts, &dampers, &settings(AssignmentPolicy::Shared));
        assert_eq!(mapping["left"], Assignment::Duct("duct".to_string()));
        assert_eq!(mapping["right"], Assignment::Duct("duct".to_string()));
    }

    #[test]
    fn test_shared_tie_keeps_first_duct() {
        let ducts = vec![vertical_duct("west", -1.0), vertical_duct("east", 1.0)];
        let dampers = vec![Damper::new("mid", Point::new(0.0, 0.0))];

        let mapping = associate(&ducts, &dampers, &settings(AssignmentPolicy::Shared));
        assert_eq!(mapping["mid"], Assignment::Duct("west".to_string()));
    }

    #[test]
    fn test_empty_duct_list_leaves_all_unassigned() {
        let dampers = vec![
            Damper::new("a", Point::new(0.0, 0.0)),
            Damper::new("b", Point::new(5.0, 5.0)),
        ];

        for policy in [AssignmentPolicy::Exclusive, AssignmentPolicy::Shared] {
            let mapping = associate(&[], &dampers, &settings(policy));
            assert_eq!(mapping.len(), 2);
            assert!(mapping.values().all(|a| *a == Assignment::Unassigned));
        }
    }

    #[test]
    fn test_no_dampers_yields_empty_mapping() {
        let ducts = vec![vertical_duct("duct", 0.0)];
        assert!(associate(&ducts, &[], &AssociationSettings::default()).is_empty());
    }
}
