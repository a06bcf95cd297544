//! Vote tallies, the CSV export and the public winners list.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{
    Category, CategoryStatus, CategoryType, Nomination, Staff, StaffSummary, VoteCount,
};

pub const CSV_HEADER: [&str; 5] = ["Category", "Nominee", "Department", "Votes", "Is Winner"];

/// One nominee's standing within a category.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub nominee_id: String,
    pub nominee_name: String,
    pub department: String,
    pub votes: i64,
    pub is_finalist: bool,
    pub is_winner: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTally {
    pub category_id: String,
    pub category_title: String,
    pub status: CategoryStatus,
    pub total_votes: i64,
    pub rows: Vec<ResultRow>,
}

/// A category whose winner has been announced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedResult {
    pub category_id: String,
    pub category_title: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub winner: StaffSummary,
    pub winner_department: String,
    pub winner_votes: i64,
    pub total_votes: i64,
    pub published_at: DateTime<Utc>,
}

/// Build per-category standings.
///
/// A nominee gets a row when they are a finalist of the category or have at
/// least one vote in it. Rows are ordered by votes (descending) then name.
/// Only the top row can be the winner, and only if it has votes.
pub fn tally(
    categories: &[Category],
    nominations: &[Nomination],
    counts: &[VoteCount],
    staff: &[Staff],
) -> Vec<CategoryTally> {
    let staff_by_id: HashMap<&str, &Staff> = staff.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut tallies: Vec<CategoryTally> = categories
        .iter()
        .map(|category| {
            let finalists: HashSet<&str> = nominations
                .iter()
                .filter(|n| n.category_id == category.id && n.is_finalist)
                .map(|n| n.nominee_id.as_str())
                .collect();

            let mut votes_by_nominee: HashMap<&str, i64> = HashMap::new();
            for count in counts.iter().filter(|c| c.category_id == category.id) {
                *votes_by_nominee.entry(count.nominee_id.as_str()).or_insert(0) += count.votes;
            }

            let nominee_ids: HashSet<&str> = finalists
                .iter()
                .copied()
                .chain(votes_by_nominee.keys().copied())
                .collect();

            let mut rows: Vec<ResultRow> = nominee_ids
                .into_iter()
                .map(|nominee_id| {
                    let person = staff_by_id.get(nominee_id);
                    ResultRow {
                        nominee_id: nominee_id.to_string(),
                        nominee_name: person.map(|p| p.name.clone()).unwrap_or_default(),
                        department: person.map(|p| p.department.clone()).unwrap_or_default(),
                        votes: votes_by_nominee.get(nominee_id).copied().unwrap_or(0),
                        is_finalist: finalists.contains(nominee_id),
                        is_winner: false,
                    }
                })
                .collect();

            rows.sort_by(|a, b| {
                b.votes
                    .cmp(&a.votes)
                    .then_with(|| a.nominee_name.cmp(&b.nominee_name))
                    .then_with(|| a.nominee_id.cmp(&b.nominee_id))
            });
            if let Some(first) = rows.first_mut() {
                first.is_winner = first.votes > 0;
            }

            CategoryTally {
                category_id: category.id.clone(),
                category_title: category.title.clone(),
                status: category.status,
                total_votes: rows.iter().map(|r| r.votes).sum(),
                rows,
            }
        })
        .collect();

    tallies.sort_by(|a, b| a.category_title.cmp(&b.category_title));
    tallies
}

/// Render tallies as the admin CSV download.
pub fn to_csv(tallies: &[CategoryTally]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for tally in tallies {
        for row in &tally.rows {
            let votes = row.votes.to_string();
            writer.write_record([
                tally.category_title.as_str(),
                row.nominee_name.as_str(),
                row.department.as_str(),
                votes.as_str(),
                if row.is_winner { "Yes" } else { "No" },
            ])?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to finish CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV is not UTF-8: {}", e)))
}

/// Categories with an announced winner, most recent first.
pub fn published_results(
    categories: &[Category],
    counts: &[VoteCount],
    staff: &[Staff],
) -> Vec<PublishedResult> {
    let mut results: Vec<PublishedResult> = categories
        .iter()
        .filter_map(|category| {
            let winner_id = category.winner_id.as_deref()?;
            let published_at = category.winner_published_at?;
            let winner = staff.iter().find(|s| s.id == winner_id)?;

            let in_category = counts.iter().filter(|c| c.category_id == category.id);
            let total_votes: i64 = in_category.clone().map(|c| c.votes).sum();
            let winner_votes: i64 = in_category
                .filter(|c| c.nominee_id == winner_id)
                .map(|c| c.votes)
                .sum();

            Some(PublishedResult {
                category_id: category.id.clone(),
                category_title: category.title.clone(),
                category_type: category.category_type,
                winner_department: winner.department.clone(),
                winner: winner.summary(),
                winner_votes,
                total_votes,
                published_at,
            })
        })
        .collect();

    results.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NominationStatus, StaffRole};
    use chrono::Duration;

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

    fn category(id: &str, title: &str) -> Category {
        Category {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            image: None,
            category_type: CategoryType::Individual,
            department: None,
            status: CategoryStatus::Published,
            nomination_deadline: Utc::now() - Duration::days(10),
            shortlisting_start: None,
            shortlisting_end: None,
            voting_start: None,
            voting_end: None,
            winner_id: None,
            winner_published_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 1,
        }
    }

    fn finalist(category_id: &str, nominee_id: &str) -> Nomination {
        Nomination {
            id: format!("{category_id}-{nominee_id}"),
            nominee_id: nominee_id.to_string(),
            nominator_id: None,
            category_id: category_id.to_string(),
            reason: "Outstanding".to_string(),
            status: NominationStatus::Shortlisted,
            is_finalist: true,
            submitted_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn count(category_id: &str, nominee_id: &str, votes: i64) -> VoteCount {
        VoteCount {
            category_id: category_id.to_string(),
            nominee_id: nominee_id.to_string(),
            votes,
        }
    }

    #[test]
    fn test_tally_orders_and_marks_single_winner() {
        let staff = vec![
            person("a", "Alice", "Finance"),
            person("b", "Bob", "Platform"),
            person("c", "Cara", "Design"),
        ];
        let categories = vec![category("cat", "Team Player")];
        let nominations = vec![finalist("cat", "a"), finalist("cat", "b"), finalist("cat", "c")];
        let counts = vec![count("cat", "a", 2), count("cat", "b", 2), count("cat", "c", 1)];

        let tallies = tally(&categories, &nominations, &counts, &staff);
        let rows = &tallies[0].rows;

        assert_eq!(tallies[0].total_votes, 5);
        let names: Vec<&str> = rows.iter().map(|r| r.nominee_name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Cara"]);
        assert!(rows[0].is_winner);
        assert!(!rows[1].is_winner);
        assert!(!rows[2].is_winner);
    }

    #[test]
    fn test_tally_without_votes_has_no_winner() {
        let staff = vec![person("a", "Alice", "Finance")];
        let categories = vec![category("cat", "Rising Star")];
        let nominations = vec![finalist("cat", "a")];

        let tallies = tally(&categories, &nominations, &[], &staff);
        assert_eq!(tallies[0].rows.len(), 1);
        assert_eq!(tallies[0].rows[0].votes, 0);
        assert!(!tallies[0].rows[0].is_winner);
    }

    #[test]
    fn test_tally_includes_voted_non_finalists() {
        let staff = vec![person("a", "Alice", "Finance"), person("b", "Bob", "Platform")];
        let categories = vec![category("cat", "Innovator")];
        let nominations = vec![finalist("cat", "a")];
        let counts = vec![count("cat", "b", 3)];

        let rows = &tally(&categories, &nominations, &counts, &staff)[0].rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].nominee_id, "b");
        assert!(!rows[0].is_finalist);
        assert!(rows[0].is_winner);
    }

    #[test]
    fn test_csv_export_format() {
        let staff = vec![person("a", "Alice, Jr.", "Finance"), person("b", "Bob", "Platform")];
        let categories = vec![category("cat", "Team Player")];
        let nominations = vec![finalist("cat", "a"), finalist("cat", "b")];
        let counts = vec![count("cat", "a", 3), count("cat", "b", 1)];

        let csv = to_csv(&tally(&categories, &nominations, &counts, &staff)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Category,Nominee,Department,Votes,Is Winner");
        assert_eq!(lines[1], "Team Player,\"Alice, Jr.\",Finance,3,Yes");
        assert_eq!(lines[2], "Team Player,Bob,Platform,1,No");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_published_results_only_with_winner() {
        let staff = vec![person("a", "Alice", "Finance")];
        let mut announced = category("cat", "Team Player");
        announced.winner_id = Some("a".to_string());
        announced.winner_published_at = Some(Utc::now());
        announced.status = CategoryStatus::Closed;
        let pending = category("other", "Innovator");

        let counts = vec![count("cat", "a", 4), count("other", "a", 2)];
        let results = published_results(&[announced, pending], &counts, &staff);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].winner.name, "Alice");
        assert_eq!(results[0].winner_department, "Finance");
        assert_eq!(results[0].winner_votes, 4);
        assert_eq!(results[0].total_votes, 4);
    }
}
