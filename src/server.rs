//! HTTP surface: the PR list page and the per-PR comments endpoint.
//!
//! The page only lists PRs. Comments are loaded by the browser one card at a
//! time through `/api/pr/{number}/comments`, so a slow or failing PR never
//! blocks the page or the other cards.

use minijinja::{context, Environment};
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::{Filter, Rejection, Reply};

use crate::config::Config;
use crate::error::Error;
use crate::gh::GhRunner;
use crate::github::{fetch_my_prs, fetch_pr_comments, fetch_repo_identity};
use crate::types::{CommentRecord, PrState, PullRequestSummary, RepositoryIdentity};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const ERROR_TEMPLATE: &str = include_str!("../templates/error.html");
const APP_JS: &str = include_str!("../static/app.js");
const STYLE_CSS: &str = include_str!("../static/style.css");

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    gh: Arc<dyn GhRunner>,
    config: Arc<Config>,
    templates: Arc<Environment<'static>>,
}

impl AppState {
    pub fn new(gh: Arc<dyn GhRunner>, config: Config) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        // Names end in .html, so minijinja auto-escapes every value.
        env.add_template("index.html", INDEX_TEMPLATE)?;
        env.add_template("error.html", ERROR_TEMPLATE)?;

        Ok(Self {
            gh,
            config: Arc::new(config),
            templates: Arc::new(env),
        })
    }

    fn render(&self, name: &str, ctx: minijinja::Value, status: StatusCode) -> Response {
        let rendered = self
            .templates
            .get_template(name)
            .and_then(|tmpl| tmpl.render(ctx));

        match rendered {
            Ok(html) => reply::with_status(reply::html(html), status).into_response(),
            Err(e) => {
                tracing::error!(template = name, "template rendering failed: {}", e);
                reply::with_status(
                    format!("template rendering failed: {}", e),
                    StatusCode::INTERNAL_SERVER_ERROR,
                )
                .into_response()
            }
        }
    }

    fn render_error(&self, error: &Error) -> Response {
        self.render(
            "error.html",
            context! {
                error_title => error.title(),
                error_message => error.to_string(),
            },
            status_for(error),
        )
    }
}

fn status_for(error: &Error) -> StatusCode {
    if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// All routes served by the app
pub fn routes(state: AppState) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let index = warp::get()
        .and(warp::path::end())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(index_page);

    let comments = warp::get()
        .and(warp::path!("api" / "pr" / String / "comments"))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state))
        .and_then(comments_endpoint);

    let health = warp::get()
        .and(warp::path!("health"))
        .map(|| reply::json(&json!({ "status": "ok", "service": "shiteki" })));

    let app_js = warp::get().and(warp::path!("static" / "app.js")).map(|| {
        reply::with_header(APP_JS, "content-type", "application/javascript; charset=utf-8")
    });

    let style_css = warp::get()
        .and(warp::path!("static" / "style.css"))
        .map(|| reply::with_header(STYLE_CSS, "content-type", "text/css; charset=utf-8"));

    index
        .or(comments)
        .or(health)
        .or(app_js)
        .or(style_css)
        .with(warp::trace::request())
}

// ============================================================================
// GET /
// ============================================================================

async fn load_index(
    state: &AppState,
    filter: &str,
) -> Result<(RepositoryIdentity, PrState, Vec<PullRequestSummary>), Error> {
    let pr_state: PrState = filter.parse()?;
    let repo = fetch_repo_identity(state.gh.as_ref()).await?;
    let limit = state.config.listing.limit;
    let prs = fetch_my_prs(state.gh.as_ref(), pr_state.as_str(), limit).await?;
    Ok((repo, pr_state, prs))
}

async fn index_page(
    query: HashMap<String, String>,
    state: AppState,
) -> Result<Response, Infallible> {
    let filter = query
        .get("state")
        .cloned()
        .unwrap_or_else(|| state.config.listing.default_state.clone());

    match load_index(&state, &filter).await {
        Ok((repo, pr_state, prs)) => {
            tracing::info!(
                repo = %repo.full_name(),
                state = %pr_state,
                count = prs.len(),
                "listed authored PRs"
            );
            Ok(state.render(
                "index.html",
                context! {
                    owner => repo.owner,
                    name => repo.name,
                    prs => prs,
                    state => pr_state.as_str(),
                    states => PrState::ALL.map(|s| s.as_str()),
                },
                StatusCode::OK,
            ))
        }
        Err(e) => {
            tracing::error!("failed to render PR list: {}", e);
            Ok(state.render_error(&e))
        }
    }
}

// ============================================================================
// GET /api/pr/{number}/comments
// ============================================================================

async fn load_comments(
    state: &AppState,
    number: u32,
    include_resolved: bool,
) -> Result<Vec<CommentRecord>, Error> {
    let repo = fetch_repo_identity(state.gh.as_ref()).await?;
    let pr = fetch_pr_comments(state.gh.as_ref(), &repo, number, include_resolved).await?;
    Ok(pr.map(|pr| pr.comments).unwrap_or_default())
}

fn parse_pr_number(segment: &str) -> Result<u32, Error> {
    segment.parse().map_err(|_| Error::InvalidPrNumber {
        value: segment.to_string(),
    })
}

fn json_error(error: &Error) -> Response {
    reply::with_status(
        reply::json(&json!({ "error": error.to_string() })),
        status_for(error),
    )
    .into_response()
}

async fn comments_endpoint(
    segment: String,
    query: HashMap<String, String>,
    state: AppState,
) -> Result<Response, Infallible> {
    let number = match parse_pr_number(&segment) {
        Ok(number) => number,
        Err(e) => {
            tracing::debug!(segment = %segment, "rejected pull request number");
            return Ok(json_error(&e));
        }
    };

    let include_resolved = query
        .get("include_resolved")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    match load_comments(&state, number, include_resolved).await {
        Ok(comments) => {
            tracing::debug!(
                pr = number,
                include_resolved,
                count = comments.len(),
                "loaded comments"
            );
            Ok(reply::json(&json!({ "data": { "comments": comments } })).into_response())
        }
        Err(e) => {
            tracing::warn!(pr = number, "failed to load comments: {}", e);
            Ok(json_error(&e))
        }
    }
}
