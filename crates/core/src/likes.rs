//! Like/dislike state machine, queued job payloads and cache key namespace.
//!
//! Every (subject, actor) pair is in one of three states: neutral, liked or
//! disliked. Toggles move between them; re-applying the current state is a
//! no-op. A move between liked and disliked produces two net actions (the
//! removal of the old reaction and the application of the new one) so that
//! each can be coalesced under its own key.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Subjects and actors
// ---------------------------------------------------------------------------

/// Kind of likeable subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeSubject {
    Post,
    Comment,
}

impl LikeSubject {
    pub fn as_str(self) -> &'static str {
        match self {
            LikeSubject::Post => "post",
            LikeSubject::Comment => "comment",
        }
    }
}

impl fmt::Display for LikeSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LikeSubject {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" | "posts" => Ok(LikeSubject::Post),
            "comment" | "comments" => Ok(LikeSubject::Comment),
            other => Err(CoreError::Validation(format!("Unknown like subject: '{other}'"))),
        }
    }
}

/// Who reacted: an authenticated user or an anonymous IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    #[serde(rename = "actorUserId")]
    User(DbId),
    #[serde(rename = "actorIp")]
    Ip(String),
}

impl Actor {
    /// Build an anonymous actor, validating and normalizing the address.
    pub fn ip(raw: &str) -> Result<Self, CoreError> {
        let addr: IpAddr = raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("Invalid IP address: '{raw}'")))?;
        Ok(Actor::Ip(addr.to_string()))
    }

    /// Key segment identifying the actor, e.g. `user:5` or `ip:10.0.0.1`.
    pub fn key(&self) -> String {
        match self {
            Actor::User(id) => format!("user:{id}"),
            Actor::Ip(ip) => format!("ip:{ip}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Actions and states
// ---------------------------------------------------------------------------

/// The base reaction an action applies to or removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub fn as_str(self) -> &'static str {
        match self {
            Reaction::Like => "like",
            Reaction::Dislike => "dislike",
        }
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A toggle requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Like,
    Unlike,
    Dislike,
    Undislike,
}

impl LikeAction {
    /// The action with any `un-` prefix stripped.
    pub fn base(self) -> Reaction {
        match self {
            LikeAction::Like | LikeAction::Unlike => Reaction::Like,
            LikeAction::Dislike | LikeAction::Undislike => Reaction::Dislike,
        }
    }

    pub fn is_removal(self) -> bool {
        matches!(self, LikeAction::Unlike | LikeAction::Undislike)
    }

    pub fn from_parts(base: Reaction, is_removal: bool) -> Self {
        match (base, is_removal) {
            (Reaction::Like, false) => LikeAction::Like,
            (Reaction::Like, true) => LikeAction::Unlike,
            (Reaction::Dislike, false) => LikeAction::Dislike,
            (Reaction::Dislike, true) => LikeAction::Undislike,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LikeAction::Like => "like",
            LikeAction::Unlike => "unlike",
            LikeAction::Dislike => "dislike",
            LikeAction::Undislike => "undislike",
        }
    }
}

impl fmt::Display for LikeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LikeAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(LikeAction::Like),
            "unlike" => Ok(LikeAction::Unlike),
            "dislike" => Ok(LikeAction::Dislike),
            "undislike" => Ok(LikeAction::Undislike),
            other => Err(CoreError::Validation(format!(
                "Unknown like action: '{other}'. Valid actions: like, unlike, dislike, undislike"
            ))),
        }
    }
}

/// Reaction state of one actor towards one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeState {
    #[default]
    Neutral,
    Liked,
    Disliked,
}

impl LikeState {
    /// State implied by a durable like record (`None` = no record).
    pub fn from_record(is_dislike: Option<bool>) -> Self {
        match is_dislike {
            None => LikeState::Neutral,
            Some(false) => LikeState::Liked,
            Some(true) => LikeState::Disliked,
        }
    }

    /// State implied by the two cache flags.
    pub fn from_flags(liked: bool, disliked: bool) -> Self {
        match (liked, disliked) {
            (true, _) => LikeState::Liked,
            (false, true) => LikeState::Disliked,
            (false, false) => LikeState::Neutral,
        }
    }
}

/// Outcome of applying one action to a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeTransition {
    pub from: LikeState,
    pub to: LikeState,
    /// Net actions to persist, in application order. Empty for a no-op.
    pub net_actions: Vec<LikeAction>,
    pub like_delta: i64,
    pub dislike_delta: i64,
}

impl LikeTransition {
    pub fn is_noop(&self) -> bool {
        self.net_actions.is_empty()
    }
}

/// Apply `action` to `state`.
pub fn apply_action(state: LikeState, action: LikeAction) -> LikeTransition {
    use LikeAction as A;
    use LikeState as S;

    let (to, net_actions, like_delta, dislike_delta) = match (state, action) {
        (S::Neutral, A::Like) => (S::Liked, vec![A::Like], 1, 0),
        (S::Disliked, A::Like) => (S::Liked, vec![A::Undislike, A::Like], 1, -1),
        (S::Liked, A::Unlike) => (S::Neutral, vec![A::Unlike], -1, 0),
        (S::Neutral, A::Dislike) => (S::Disliked, vec![A::Dislike], 0, 1),
        (S::Liked, A::Dislike) => (S::Disliked, vec![A::Unlike, A::Dislike], -1, 1),
        (S::Disliked, A::Undislike) => (S::Neutral, vec![A::Undislike], 0, -1),
        (current, _) => (current, Vec::new(), 0, 0),
    };

    LikeTransition {
        from: state,
        to,
        net_actions,
        like_delta,
        dislike_delta,
    }
}

// ---------------------------------------------------------------------------
// Queued jobs
// ---------------------------------------------------------------------------

/// Deterministic identity of a pending action and of its queued job:
/// `type:subjectId:actorKey:baseAction`.
pub fn pending_key(subject: LikeSubject, subject_id: DbId, actor: &Actor, action: LikeAction) -> String {
    format!(
        "{}:{}:{}:{}",
        subject.as_str(),
        subject_id,
        actor.key(),
        action.base().as_str()
    )
}

/// Payload of one queued like job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeJobPayload {
    #[serde(flatten)]
    pub actor: Actor,
    pub target_id: DbId,
    pub action: Reaction,
    pub is_removal: bool,
    #[serde(rename = "type")]
    pub subject: LikeSubject,
}

impl LikeJobPayload {
    pub fn new(subject: LikeSubject, target_id: DbId, actor: Actor, action: LikeAction) -> Self {
        Self {
            actor,
            target_id,
            action: action.base(),
            is_removal: action.is_removal(),
            subject,
        }
    }

    pub fn like_action(&self) -> LikeAction {
        LikeAction::from_parts(self.action, self.is_removal)
    }

    pub fn job_key(&self) -> String {
        pending_key(self.subject, self.target_id, &self.actor, self.like_action())
    }
}

// ---------------------------------------------------------------------------
// Cache key namespace
// ---------------------------------------------------------------------------

/// Cache keys shared with the surrounding system. Formats must not change.
pub mod cache_keys {
    use super::{Actor, LikeSubject, Reaction};
    use crate::types::DbId;

    /// Counter key, e.g. `post:7:likes` / `post:7:dislikes`.
    pub fn counter(subject: LikeSubject, subject_id: DbId, reaction: Reaction) -> String {
        let suffix = match reaction {
            Reaction::Like => "likes",
            Reaction::Dislike => "dislikes",
        };
        format!("{}:{subject_id}:{suffix}", subject.as_str())
    }

    /// Durable version of the cached counters, e.g. `post:7:counters:version`.
    pub fn counter_version(subject: LikeSubject, subject_id: DbId) -> String {
        format!("{}:{subject_id}:counters:version", subject.as_str())
    }

    /// Per-actor flag key, e.g. `user:5:post:7:like` / `ip:1.2.3.4:comment:9:dislike`.
    pub fn flag(subject: LikeSubject, subject_id: DbId, actor: &Actor, reaction: Reaction) -> String {
        format!(
            "{}:{}:{subject_id}:{}",
            actor.key(),
            subject.as_str(),
            reaction.as_str()
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // -- state machine --------------------------------------------------------

    #[test]
    fn like_from_neutral() {
        let t = apply_action(LikeState::Neutral, LikeAction::Like);
        assert_eq!(t.to, LikeState::Liked);
        assert_eq!(t.net_actions, vec![LikeAction::Like]);
        assert_eq!((t.like_delta, t.dislike_delta), (1, 0));
    }

    #[test]
    fn like_from_disliked_flips() {
        let t = apply_action(LikeState::Disliked, LikeAction::Like);
        assert_eq!(t.to, LikeState::Liked);
        assert_eq!(t.net_actions, vec![LikeAction::Undislike, LikeAction::Like]);
        assert_eq!((t.like_delta, t.dislike_delta), (1, -1));
    }

    #[test]
    fn dislike_from_liked_flips() {
        let t = apply_action(LikeState::Liked, LikeAction::Dislike);
        assert_eq!(t.to, LikeState::Disliked);
        assert_eq!(t.net_actions, vec![LikeAction::Unlike, LikeAction::Dislike]);
        assert_eq!((t.like_delta, t.dislike_delta), (-1, 1));
    }

    #[test]
    fn reapplying_current_state_is_noop() {
        assert!(apply_action(LikeState::Liked, LikeAction::Like).is_noop());
        assert!(apply_action(LikeState::Disliked, LikeAction::Dislike).is_noop());
    }

    #[test]
    fn removal_without_matching_state_is_noop() {
        assert!(apply_action(LikeState::Neutral, LikeAction::Unlike).is_noop());
        assert!(apply_action(LikeState::Disliked, LikeAction::Unlike).is_noop());
        assert!(apply_action(LikeState::Liked, LikeAction::Undislike).is_noop());
    }

    #[test]
    fn dislike_like_like_nets_one_like() {
        let mut state = LikeState::Neutral;
        let (mut likes, mut dislikes) = (0i64, 0i64);
        for action in [LikeAction::Dislike, LikeAction::Like, LikeAction::Like] {
            let t = apply_action(state, action);
            likes += t.like_delta;
            dislikes += t.dislike_delta;
            state = t.to;
        }
        assert_eq!(state, LikeState::Liked);
        assert_eq!((likes, dislikes), (1, 0));
    }

    #[test]
    fn counters_never_go_negative_over_any_sequence() {
        let actions = [
            LikeAction::Unlike,
            LikeAction::Like,
            LikeAction::Unlike,
            LikeAction::Unlike,
            LikeAction::Dislike,
            LikeAction::Undislike,
            LikeAction::Undislike,
            LikeAction::Like,
            LikeAction::Dislike,
        ];
        let mut state = LikeState::Neutral;
        let (mut likes, mut dislikes) = (0i64, 0i64);
        for action in actions {
            let t = apply_action(state, action);
            likes += t.like_delta;
            dislikes += t.dislike_delta;
            assert!(likes >= 0 && dislikes >= 0);
            state = t.to;
        }
    }

    // -- state helpers --------------------------------------------------------

    #[test]
    fn state_from_record_and_flags() {
        assert_eq!(LikeState::from_record(None), LikeState::Neutral);
        assert_eq!(LikeState::from_record(Some(false)), LikeState::Liked);
        assert_eq!(LikeState::from_record(Some(true)), LikeState::Disliked);
        assert_eq!(LikeState::from_flags(false, true), LikeState::Disliked);
        assert_eq!(LikeState::from_flags(false, false), LikeState::Neutral);
    }

    // -- keys -----------------------------------------------------------------

    #[test]
    fn pending_key_strips_un_prefix() {
        let actor = Actor::User(5);
        assert_eq!(
            pending_key(LikeSubject::Post, 12, &actor, LikeAction::Unlike),
            "post:12:user:5:like"
        );
        assert_eq!(
            pending_key(LikeSubject::Comment, 3, &actor, LikeAction::Undislike),
            "comment:3:user:5:dislike"
        );
    }

    #[test]
    fn cache_key_formats() {
        let user = Actor::User(5);
        let anon = Actor::ip("10.0.0.1").unwrap();
        assert_eq!(cache_keys::counter(LikeSubject::Post, 7, Reaction::Like), "post:7:likes");
        assert_eq!(
            cache_keys::counter(LikeSubject::Comment, 7, Reaction::Dislike),
            "comment:7:dislikes"
        );
        assert_eq!(
            cache_keys::flag(LikeSubject::Post, 7, &user, Reaction::Like),
            "user:5:post:7:like"
        );
        assert_eq!(
            cache_keys::flag(LikeSubject::Comment, 7, &user, Reaction::Like),
            "user:5:comment:7:like"
        );
        assert_eq!(
            cache_keys::flag(LikeSubject::Post, 7, &anon, Reaction::Dislike),
            "ip:10.0.0.1:post:7:dislike"
        );
        assert_eq!(
            cache_keys::counter_version(LikeSubject::Comment, 7),
            "comment:7:counters:version"
        );
    }

    #[test]
    fn ip_actor_is_validated() {
        assert_matches!(Actor::ip("not-an-ip"), Err(CoreError::Validation(_)));
        assert_eq!(Actor::ip(" 192.168.0.1 ").unwrap(), Actor::Ip("192.168.0.1".into()));
    }

    // -- payloads -------------------------------------------------------------

    #[test]
    fn job_payload_wire_shape() {
        let payload = LikeJobPayload::new(LikeSubject::Comment, 9, Actor::User(4), LikeAction::Unlike);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "actorUserId": 4,
                "targetId": 9,
                "action": "like",
                "isRemoval": true,
                "type": "comment"
            })
        );
        let back: LikeJobPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back.job_key(), "comment:9:user:4:like");
    }

    #[test]
    fn job_payload_with_ip_actor() {
        let payload = LikeJobPayload::new(
            LikeSubject::Post,
            1,
            Actor::Ip("10.1.1.1".into()),
            LikeAction::Dislike,
        );
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["actorIp"], "10.1.1.1");
        assert_eq!(json["isRemoval"], false);
        assert_eq!(payload.like_action(), LikeAction::Dislike);
    }
}
