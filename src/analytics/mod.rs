//! Admin analytics, recomputed from full row sets on every request.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{
    Category, CategoryStatus, Department, Nomination, NominationDetail, NominationStatus, Staff,
    StaffSummary, Vote,
};

/// How many nominees the leaderboards show.
pub const TOP_NOMINEES: usize = 5;
/// How many nominations the dashboard lists.
pub const RECENT_NOMINATIONS: usize = 5;

/// Everything the reducers look at.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub staff: &'a [Staff],
    pub departments: &'a [Department],
    pub categories: &'a [Category],
    pub nominations: &'a [Nomination],
    pub votes: &'a [Vote],
    pub feedback: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub staff: usize,
    pub departments: usize,
    pub categories: usize,
    pub draft_categories: usize,
    pub published_categories: usize,
    pub closed_categories: usize,
    pub nominations: usize,
    pub votes: usize,
    pub feedback: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub status: NominationStatus,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentCount {
    pub department: String,
    pub nominations: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryActivity {
    pub category_id: String,
    pub title: String,
    pub nominations: usize,
    pub votes: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NomineeRank {
    pub nominee: StaffSummary,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participation {
    pub voters: usize,
    pub staff: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub totals: Totals,
    pub nominations_by_status: Vec<StatusBreakdown>,
    pub nominations_by_department: Vec<DepartmentCount>,
    pub category_activity: Vec<CategoryActivity>,
    pub top_nominated: Vec<NomineeRank>,
    pub top_voted: Vec<NomineeRank>,
    pub participation: Participation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub totals: Totals,
    pub pending_nominations: usize,
    pub recent_nominations: Vec<NominationDetail>,
}

/// `part / whole` as a percentage rounded to one decimal. Zero when `whole` is.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / whole as f64).round() / 10.0
}

pub fn totals(snapshot: &Snapshot<'_>) -> Totals {
    let with_status = |status: CategoryStatus| {
        snapshot
            .categories
            .iter()
            .filter(|c| c.status == status)
            .count()
    };

    Totals {
        staff: snapshot.staff.len(),
        departments: snapshot.departments.len(),
        categories: snapshot.categories.len(),
        draft_categories: with_status(CategoryStatus::Draft),
        published_categories: with_status(CategoryStatus::Published),
        closed_categories: with_status(CategoryStatus::Closed),
        nominations: snapshot.nominations.len(),
        votes: snapshot.votes.len(),
        feedback: snapshot.feedback,
    }
}

pub fn nominations_by_status(nominations: &[Nomination]) -> Vec<StatusBreakdown> {
    NominationStatus::ALL
        .iter()
        .map(|&status| {
            let count = nominations.iter().filter(|n| n.status == status).count();
            StatusBreakdown {
                status,
                count,
                percentage: percentage(count, nominations.len()),
            }
        })
        .collect()
}

/// Grouped by the nominee's department; staff without one count as "Unassigned".
pub fn nominations_by_department(
    nominations: &[Nomination],
    staff: &[Staff],
) -> Vec<DepartmentCount> {
    let department_of: HashMap<&str, &str> = staff
        .iter()
        .map(|s| (s.id.as_str(), s.department.as_str()))
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for nomination in nominations {
        let department = department_of
            .get(nomination.nominee_id.as_str())
            .copied()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("Unassigned");
        *counts.entry(department).or_insert(0) += 1;
    }

    let mut result: Vec<DepartmentCount> = counts
        .into_iter()
        .map(|(department, nominations)| DepartmentCount {
            department: department.to_string(),
            nominations,
        })
        .collect();
    result.sort_by(|a, b| {
        b.nominations
            .cmp(&a.nominations)
            .then_with(|| a.department.cmp(&b.department))
    });
    result
}

pub fn category_activity(
    categories: &[Category],
    nominations: &[Nomination],
    votes: &[Vote],
) -> Vec<CategoryActivity> {
    let mut activity: Vec<CategoryActivity> = categories
        .iter()
        .map(|category| CategoryActivity {
            category_id: category.id.clone(),
            title: category.title.clone(),
            nominations: nominations
                .iter()
                .filter(|n| n.category_id == category.id)
                .count(),
            votes: votes.iter().filter(|v| v.category_id == category.id).count(),
        })
        .collect();
    activity.sort_by(|a, b| a.title.cmp(&b.title));
    activity
}

/// Rank nominees by how often `ids` mentions them. Ties go to the name.
fn top_by<'a>(ids: impl Iterator<Item = &'a str>, staff: &[Staff]) -> Vec<NomineeRank> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for id in ids {
        *counts.entry(id).or_insert(0) += 1;
    }

    let mut ranked: Vec<NomineeRank> = staff
        .iter()
        .filter_map(|s| {
            counts.get(s.id.as_str()).map(|&count| NomineeRank {
                nominee: s.summary(),
                count,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.nominee.name.cmp(&b.nominee.name))
    });
    ranked.truncate(TOP_NOMINEES);
    ranked
}

pub fn top_nominated(nominations: &[Nomination], staff: &[Staff]) -> Vec<NomineeRank> {
    top_by(nominations.iter().map(|n| n.nominee_id.as_str()), staff)
}

pub fn top_voted(votes: &[Vote], staff: &[Staff]) -> Vec<NomineeRank> {
    top_by(votes.iter().map(|v| v.nominee_id.as_str()), staff)
}

pub fn participation(votes: &[Vote], staff: &[Staff]) -> Participation {
    let voters: HashSet<&str> = votes.iter().map(|v| v.voter_id.as_str()).collect();
    Participation {
        voters: voters.len(),
        staff: staff.len(),
        percentage: percentage(voters.len(), staff.len()),
    }
}

pub fn analyze(snapshot: &Snapshot<'_>) -> Analytics {
    Analytics {
        totals: totals(snapshot),
        nominations_by_status: nominations_by_status(snapshot.nominations),
        nominations_by_department: nominations_by_department(snapshot.nominations, snapshot.staff),
        category_activity: category_activity(
            snapshot.categories,
            snapshot.nominations,
            snapshot.votes,
        ),
        top_nominated: top_nominated(snapshot.nominations, snapshot.staff),
        top_voted: top_voted(snapshot.votes, snapshot.staff),
        participation: participation(snapshot.votes, snapshot.staff),
    }
}

/// Dashboard summary. `recent` is expected newest first.
pub fn dashboard(snapshot: &Snapshot<'_>, recent: Vec<NominationDetail>) -> Dashboard {
    Dashboard {
        totals: totals(snapshot),
        pending_nominations: snapshot
            .nominations
            .iter()
            .filter(|n| n.status == NominationStatus::Pending)
            .count(),
        recent_nominations: recent.into_iter().take(RECENT_NOMINATIONS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StaffRole;
    use chrono::Utc;

    fn person(id: &str, name: &str, department: &str) -> Staff {
        Staff {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{id}@example.com"),
            position: String::new(),
            department: department.to_string(),
            avatar: None,
            role: StaffRole::Staff,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 1,
        }
    }

    fn nomination(nominee: &str, category: &str, status: NominationStatus) -> Nomination {
        Nomination {
            id: uuid::Uuid::new_v4().to_string(),
            nominee_id: nominee.to_string(),
            nominator_id: None,
            category_id: category.to_string(),
            reason: "Great".to_string(),
            status,
            is_finalist: status == NominationStatus::Shortlisted,
            submitted_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn vote(voter: &str, category: &str, nominee: &str) -> Vote {
        Vote {
            id: uuid::Uuid::new_v4().to_string(),
            voter_id: voter.to_string(),
            category_id: category.to_string(),
            nominee_id: nominee.to_string(),
            voted_at: Utc::now(),
        }
    }

    #[test]
    fn test_percentage_rounding_and_zero() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 5), 100.0);
    }

    #[test]
    fn test_nominations_by_status_covers_every_status() {
        let nominations = vec![
            nomination("a", "c1", NominationStatus::Pending),
            nomination("b", "c1", NominationStatus::Pending),
            nomination("c", "c1", NominationStatus::Approved),
        ];

        let breakdown = nominations_by_status(&nominations);
        assert_eq!(breakdown.len(), 4);
        assert_eq!(breakdown[0].status, NominationStatus::Pending);
        assert_eq!(breakdown[0].count, 2);
        assert_eq!(breakdown[0].percentage, 66.7);
        assert_eq!(breakdown[2].count, 0);
        assert_eq!(breakdown[2].percentage, 0.0);
    }

    #[test]
    fn test_nominations_by_department() {
        let staff = vec![
            person("a", "Alice", "Finance"),
            person("b", "Bob", "Finance"),
            person("c", "Cara", ""),
        ];
        let nominations = vec![
            nomination("a", "c1", NominationStatus::Pending),
            nomination("b", "c1", NominationStatus::Pending),
            nomination("c", "c1", NominationStatus::Pending),
        ];

        let departments = nominations_by_department(&nominations, &staff);
        assert_eq!(
            departments,
            vec![
                DepartmentCount {
                    department: "Finance".to_string(),
                    nominations: 2
                },
                DepartmentCount {
                    department: "Unassigned".to_string(),
                    nominations: 1
                },
            ]
        );
    }

    #[test]
    fn test_top_lists_are_capped_and_ordered() {
        let staff: Vec<Staff> = (0..7)
            .map(|i| person(&format!("s{i}"), &format!("Person {i}"), "Ops"))
            .collect();
        let mut nominations = Vec::new();
        for (i, member) in staff.iter().enumerate() {
            for _ in 0..=i {
                nominations.push(nomination(&member.id, "c1", NominationStatus::Pending));
            }
        }

        let top = top_nominated(&nominations, &staff);
        assert_eq!(top.len(), TOP_NOMINEES);
        assert_eq!(top[0].nominee.id, "s6");
        assert_eq!(top[0].count, 7);
        assert_eq!(top[4].nominee.id, "s2");
    }

    #[test]
    fn test_participation_counts_distinct_voters() {
        let staff = vec![
            person("a", "Alice", "Finance"),
            person("b", "Bob", "Finance"),
            person("c", "Cara", "Ops"),
        ];
        let votes = vec![vote("a", "c1", "b"), vote("a", "c2", "c"), vote("b", "c1", "c")];

        let result = participation(&votes, &staff);
        assert_eq!(result.voters, 2);
        assert_eq!(result.staff, 3);
        assert_eq!(result.percentage, 66.7);

        let voted = top_voted(&votes, &staff);
        assert_eq!(voted[0].nominee.id, "c");
        assert_eq!(voted[0].count, 2);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot {
            staff: &[],
            departments: &[],
            categories: &[],
            nominations: &[],
            votes: &[],
            feedback: 0,
        };

        let analytics = analyze(&snapshot);
        assert_eq!(analytics.totals.nominations, 0);
        assert!(analytics.top_nominated.is_empty());
        assert_eq!(analytics.participation.percentage, 0.0);
        assert!(analytics
            .nominations_by_status
            .iter()
            .all(|s| s.percentage == 0.0));

        let dashboard = dashboard(&snapshot, Vec::new());
        assert_eq!(dashboard.pending_nominations, 0);
        assert!(dashboard.recent_nominations.is_empty());
    }
}
