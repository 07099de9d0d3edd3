use serde::Deserialize;

use crate::diff::render_hunk;
use crate::error::Error;
use crate::gh::GhRunner;
use crate::types::{
    format_created, CommentRecord, PrState, PrWithComments, PullRequestSummary, RepositoryIdentity,
};

/// Review threads requested per PR. Anything beyond is truncated.
pub const THREAD_PAGE_SIZE: u32 = 100;

/// Comments requested per thread. Anything beyond is truncated.
pub const COMMENT_PAGE_SIZE: u32 = 100;

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Repository identity
// ============================================================================

/// JSON structure for `gh repo view --json owner,name`
#[derive(Debug, Deserialize)]
struct GhRepoView {
    name: String,
    owner: GhLogin,
}

#[derive(Debug, Deserialize)]
struct GhLogin {
    login: String,
}

/// Resolve the owner and name of the repository in the working directory
pub async fn fetch_repo_identity(gh: &dyn GhRunner) -> Result<RepositoryIdentity, Error> {
    let output = gh
        .run(&args(&["repo", "view", "--json", "owner,name"]))
        .await
        .map_err(|e| Error::RepositoryResolution {
            message: match e {
                Error::ExternalTool { message, .. } => message,
                other => other.to_string(),
            },
        })?;

    let view: GhRepoView =
        serde_json::from_str(&output).map_err(|e| Error::RepositoryResolution {
            message: format!("unexpected `gh repo view` output: {}", e),
        })?;

    Ok(RepositoryIdentity {
        owner: view.owner.login,
        name: view.name,
    })
}

// ============================================================================
// Authored PR listing
// ============================================================================

/// List PRs authored by the current user in the current repository.
///
/// `state` must be one of open, closed, merged or all; anything else fails
/// before `gh` is invoked. Order is whatever `gh` returns.
pub async fn fetch_my_prs(
    gh: &dyn GhRunner,
    state: &str,
    limit: u32,
) -> Result<Vec<PullRequestSummary>, Error> {
    let state: PrState = state.parse()?;

    let output = gh
        .run(&[
            "pr".to_string(),
            "list".to_string(),
            "--author".to_string(),
            "@me".to_string(),
            "--state".to_string(),
            state.as_str().to_string(),
            "--json".to_string(),
            "number,title,url".to_string(),
            "--limit".to_string(),
            limit.to_string(),
        ])
        .await?;

    if output.is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&output).map_err(|e| Error::DataFetch {
        message: format!("failed to parse PR list JSON: {}", e),
    })
}

// ============================================================================
// Review thread comments
// ============================================================================

const REVIEW_THREADS_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      number
      title
      url
      reviewThreads(first: 100) {
        pageInfo { hasNextPage }
        nodes {
          isResolved
          comments(first: 100) {
            pageInfo { hasNextPage }
            nodes {
              url
              path
              diffHunk
              bodyHTML
              createdAt
              author { login url }
            }
          }
        }
      }
    }
  }
}
"#;

// GraphQL response structures
#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<GraphQLData>,
    #[serde(default)]
    errors: Vec<GraphQLError>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQLData {
    repository: Option<RepositoryData>,
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    #[serde(rename = "pullRequest")]
    pull_request: Option<PullRequestData>,
}

#[derive(Debug, Deserialize)]
struct PullRequestData {
    number: u32,
    title: String,
    url: String,
    #[serde(rename = "reviewThreads")]
    review_threads: Connection<ReviewThreadNode>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Connection<T> {
    #[serde(rename = "pageInfo", default)]
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage", default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct ReviewThreadNode {
    #[serde(rename = "isResolved")]
    is_resolved: bool,
    comments: Connection<CommentNode>,
}

#[derive(Debug, Deserialize)]
struct CommentNode {
    url: Option<String>,
    path: Option<String>,
    #[serde(rename = "diffHunk")]
    diff_hunk: Option<String>,
    #[serde(rename = "bodyHTML", default)]
    body_html: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: Option<String>,
    author: Option<AuthorNode>,
}

#[derive(Debug, Deserialize)]
struct AuthorNode {
    login: Option<String>,
    url: Option<String>,
}

/// Whether a `gh` failure means the PR simply isn't there
fn is_not_found(message: &str) -> bool {
    message.contains("Could not resolve to a PullRequest")
}

/// Fetch one PR's review comments.
///
/// Threads that are resolved are dropped unless `include_resolved` is set.
/// Returns `Ok(None)` when the PR does not exist or is not accessible.
pub async fn fetch_pr_comments(
    gh: &dyn GhRunner,
    repo: &RepositoryIdentity,
    number: u32,
    include_resolved: bool,
) -> Result<Option<PrWithComments>, Error> {
    let output = gh
        .run(&[
            "api".to_string(),
            "graphql".to_string(),
            "-f".to_string(),
            format!("query={}", REVIEW_THREADS_QUERY),
            "-f".to_string(),
            format!("owner={}", repo.owner),
            "-f".to_string(),
            format!("name={}", repo.name),
            "-F".to_string(),
            format!("number={}", number),
        ])
        .await;

    let output = match output {
        Ok(output) => output,
        Err(Error::ExternalTool { message, .. }) if is_not_found(&message) => {
            tracing::info!(pr = number, "pull request not found upstream");
            return Ok(None);
        }
        Err(Error::ExternalTool { message, .. }) => return Err(Error::DataFetch { message }),
        Err(e) => return Err(e),
    };

    parse_pr_comments(&output, include_resolved)
}

/// Shape a GraphQL response into a `PrWithComments`
fn parse_pr_comments(json: &str, include_resolved: bool) -> Result<Option<PrWithComments>, Error> {
    let response: GraphQLResponse = serde_json::from_str(json).map_err(|e| Error::DataFetch {
        message: format!("failed to parse GraphQL response: {}", e),
    })?;

    if !response.errors.is_empty() {
        if response
            .errors
            .iter()
            .all(|e| e.kind.as_deref() == Some("NOT_FOUND"))
        {
            return Ok(None);
        }
        let messages: Vec<_> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(Error::DataFetch {
            message: format!("GraphQL errors: {}", messages.join(", ")),
        });
    }

    let Some(pr) = response
        .data
        .and_then(|d| d.repository)
        .and_then(|r| r.pull_request)
    else {
        return Ok(None);
    };

    if pr.review_threads.page_info.has_next_page {
        tracing::warn!(
            pr = pr.number,
            "more than {} review threads; the rest are not shown",
            THREAD_PAGE_SIZE
        );
    }

    let mut comments = Vec::new();
    for thread in pr.review_threads.nodes {
        if thread.is_resolved && !include_resolved {
            continue;
        }

        if thread.comments.page_info.has_next_page {
            tracing::warn!(
                pr = pr.number,
                "review thread has more than {} comments; the rest are not shown",
                COMMENT_PAGE_SIZE
            );
        }

        for comment in thread.comments.nodes {
            let (author, author_url) = match comment.author {
                Some(a) => (a.login, a.url),
                None => (None, None),
            };
            let created_label = comment.created_at.as_deref().and_then(format_created);

            comments.push(CommentRecord {
                url: comment.url,
                path: comment.path,
                diff_hunk_html: comment.diff_hunk.as_deref().map(render_hunk),
                diff_hunk: comment.diff_hunk,
                author,
                author_url,
                body_html: comment.body_html.unwrap_or_default(),
                created_at: comment.created_at,
                created_label,
                is_resolved: thread.is_resolved,
            });
        }
    }

    Ok(Some(PrWithComments {
        summary: PullRequestSummary {
            number: pr.number,
            title: pr.title,
            url: pr.url,
        },
        comments,
    }))
}
