//! Like/dislike toggles and reaction summaries for posts and comments.

use axum::extract::{Path, State};
use axum::Json;
use crewhub_core::likes::{LikeAction, LikeSubject};
use crewhub_core::types::DbId;
use crewhub_likes::{ReactionSummary, ToggleResult};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::actor::ReactionActor;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleReactionRequest {
    /// `like`, `unlike`, `dislike` or `undislike`.
    pub action: LikeAction,
}

async fn toggle(
    state: &AppState,
    subject: LikeSubject,
    subject_id: DbId,
    ReactionActor(actor): ReactionActor,
    action: LikeAction,
) -> AppResult<Json<DataResponse<ToggleResult>>> {
    let result = state.likes.toggle(subject, subject_id, &actor, action).await?;

    tracing::debug!(
        subject = %subject,
        subject_id,
        actor = %actor.key(),
        action = action.as_str(),
        state = ?result.state,
        changed = result.changed,
        "Reaction toggled"
    );
    Ok(Json(DataResponse { data: result }))
}

/// An unidentifiable anonymous caller still gets the counters.
async fn summary(
    state: &AppState,
    subject: LikeSubject,
    subject_id: DbId,
    actor: Result<ReactionActor, AppError>,
) -> AppResult<Json<DataResponse<ReactionSummary>>> {
    let actor = match actor {
        Ok(ReactionActor(actor)) => Some(actor),
        Err(AppError::BadRequest(_)) => None,
        Err(e) => return Err(e),
    };
    let summary = state
        .likes
        .reaction_summary(subject, subject_id, actor.as_ref())
        .await?;
    Ok(Json(DataResponse { data: summary }))
}

/// POST /api/v1/posts/{id}/reactions
pub async fn toggle_post_reaction(
    State(state): State<AppState>,
    Path(post_id): Path<DbId>,
    actor: ReactionActor,
    Json(input): Json<ToggleReactionRequest>,
) -> AppResult<Json<DataResponse<ToggleResult>>> {
    toggle(&state, LikeSubject::Post, post_id, actor, input.action).await
}

/// POST /api/v1/comments/{id}/reactions
pub async fn toggle_comment_reaction(
    State(state): State<AppState>,
    Path(comment_id): Path<DbId>,
    actor: ReactionActor,
    Json(input): Json<ToggleReactionRequest>,
) -> AppResult<Json<DataResponse<ToggleResult>>> {
    toggle(&state, LikeSubject::Comment, comment_id, actor, input.action).await
}

/// GET /api/v1/posts/{id}/reactions
pub async fn post_reactions(
    State(state): State<AppState>,
    Path(post_id): Path<DbId>,
    actor: Result<ReactionActor, AppError>,
) -> AppResult<Json<DataResponse<ReactionSummary>>> {
    summary(&state, LikeSubject::Post, post_id, actor).await
}

/// GET /api/v1/comments/{id}/reactions
pub async fn comment_reactions(
    State(state): State<AppState>,
    Path(comment_id): Path<DbId>,
    actor: Result<ReactionActor, AppError>,
) -> AppResult<Json<DataResponse<ReactionSummary>>> {
    summary(&state, LikeSubject::Comment, comment_id, actor).await
}
