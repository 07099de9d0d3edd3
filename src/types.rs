use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Lifecycle-state filter for the authored PR listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrState {
    #[default]
    Open,
    Closed,
    Merged,
    All,
}

impl PrState {
    pub const ALL: [PrState; 4] = [PrState::Open, PrState::Closed, PrState::Merged, PrState::All];

    /// Value accepted by `gh pr list --state`
    pub fn as_str(&self) -> &'static str {
        match self {
            PrState::Open => "open",
            PrState::Closed => "closed",
            PrState::Merged => "merged",
            PrState::All => "all",
        }
    }
}

impl FromStr for PrState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(PrState::Open),
            "closed" => Ok(PrState::Closed),
            "merged" => Ok(PrState::Merged),
            "all" => Ok(PrState::All),
            _ => Err(Error::InvalidState {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The repository `gh` resolves from the working directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryIdentity {
    pub owner: String,
    pub name: String,
}

impl RepositoryIdentity {
    /// Full repository name (owner/name)
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A PR as shown on the page before its comments are loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct PullRequestSummary {
    pub number: u32,
    pub title: String,
    pub url: String,
}

/// One review comment, flattened out of its thread.
///
/// `body_html` is GitHub's rendered, sanitised HTML and is shown unescaped by
/// the page. Anything that builds a `CommentRecord` from another source must
/// sanitise the body first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub url: Option<String>,
    pub path: Option<String>,
    pub diff_hunk: Option<String>,
    /// `diff_hunk` classified and escaped by `diff::render_hunk`
    pub diff_hunk_html: Option<String>,
    pub author: Option<String>,
    pub author_url: Option<String>,
    #[serde(rename = "bodyHTML")]
    pub body_html: String,
    pub created_at: Option<String>,
    /// `created_at` as a calendar date in UTC. The relative age is left to the
    /// browser so the payload does not change with the clock.
    pub created_label: Option<String>,
    /// Inherited from the parent thread
    pub is_resolved: bool,
}

/// A PR together with the comments that survived filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrWithComments {
    #[serde(flatten)]
    pub summary: PullRequestSummary,
    pub comments: Vec<CommentRecord>,
}

/// Format an RFC 3339 timestamp as a UTC calendar date (e.g., "Jun 14, 2024")
pub fn format_created(timestamp: &str) -> Option<String> {
    let created = chrono::DateTime::parse_from_rfc3339(timestamp).ok()?;
    Some(
        created
            .with_timezone(&chrono::Utc)
            .format("%b %-d, %Y")
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pr_state_parse() {
        assert_eq!("open".parse::<PrState>().unwrap(), PrState::Open);
        assert_eq!("CLOSED".parse::<PrState>().unwrap(), PrState::Closed);
        assert_eq!(" merged ".parse::<PrState>().unwrap(), PrState::Merged);
        assert_eq!("all".parse::<PrState>().unwrap(), PrState::All);
    }

    #[test]
    fn test_pr_state_invalid() {
        for bad in ["", "draft", "opened", "open,closed", "*"] {
            let err = bad.parse::<PrState>().unwrap_err();
            assert_eq!(
                err,
                Error::InvalidState {
                    value: bad.to_string()
                }
            );
        }
    }

    #[test]
    fn test_pr_state_round_trips_through_display() {
        for state in PrState::ALL {
            assert_eq!(state.to_string().parse::<PrState>().unwrap(), state);
        }
    }

    #[test]
    fn test_comment_record_serializes_camel_case() {
        let record = CommentRecord {
            url: Some("https://github.com/acme/widgets/pull/42#discussion_r1".to_string()),
            path: Some("src/x.go".to_string()),
            diff_hunk: None,
            diff_hunk_html: None,
            author: None,
            author_url: None,
            body_html: "<p>hi</p>".to_string(),
            created_at: None,
            created_label: None,
            is_resolved: false,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["bodyHTML"], "<p>hi</p>");
        assert_eq!(json["isResolved"], false);
        assert_eq!(json["path"], "src/x.go");
        assert!(json["author"].is_null());
        assert!(json["authorUrl"].is_null());
        assert!(json["diffHunk"].is_null());
    }

    #[test]
    fn test_pr_with_comments_flattens_summary() {
        let pr = PrWithComments {
            summary: PullRequestSummary {
                number: 42,
                title: "Fix race".to_string(),
                url: "https://github.com/acme/widgets/pull/42".to_string(),
            },
            comments: vec![],
        };
        let json = serde_json::to_value(&pr).unwrap();
        assert_eq!(json["number"], 42);
        assert_eq!(json["title"], "Fix race");
        assert!(json["comments"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_format_created() {
        assert_eq!(format_created("2024-06-14T12:00:00Z").unwrap(), "Jun 14, 2024");
        assert_eq!(format_created("2024-01-05T00:30:00Z").unwrap(), "Jan 5, 2024");
    }

    #[test]
    fn test_format_created_normalises_offset_to_utc() {
        assert_eq!(
            format_created("2024-06-14T23:30:00-02:00").unwrap(),
            "Jun 15, 2024"
        );
    }

    #[test]
    fn test_format_created_invalid() {
        assert!(format_created("yesterday").is_none());
        assert!(format_created("").is_none());
    }

    #[test]
    fn test_repository_full_name() {
        let repo = RepositoryIdentity {
            owner: "acme".to_string(),
            name: "widgets".to_string(),
        };
        assert_eq!(repo.full_name(), "acme/widgets");
    }
}
