use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoteOptionId(pub u64);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VoteOptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Route difficulty grades as published by the trail catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Beginner => "初级",
            Self::Intermediate => "中级",
            Self::Advanced => "高级",
            Self::Expert => "专业级",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A hiking route. Immutable once an activity references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub distance_km: f64,
    pub elevation_m: f64,
    pub duration_hours: f64,
    pub difficulty: Difficulty,
    pub hot_score: f64,
    /// Comma-joined tag set, e.g. "森林,亲子,轻松".
    pub tags: String,
    pub cover_url: String,
    pub description: String,
    pub location: String,
    pub source_url: String,
}

impl Route {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.split(',').any(|t| t.trim() == tag)
    }
}

/// Route fields known before the store assigns an identity.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDraft {
    pub name: String,
    pub distance_km: f64,
    pub elevation_m: f64,
    pub duration_hours: f64,
    pub difficulty: Difficulty,
    pub hot_score: f64,
    pub tags: String,
    pub cover_url: String,
    pub description: String,
    pub location: String,
    pub source_url: String,
}

impl RouteDraft {
    pub(crate) fn into_route(self, id: RouteId) -> Route {
        Route {
            id,
            name: self.name,
            distance_km: self.distance_km,
            elevation_m: self.elevation_m,
            duration_hours: self.duration_hours,
            difficulty: self.difficulty,
            hot_score: self.hot_score,
            tags: self.tags,
            cover_url: self.cover_url,
            description: self.description,
            location: self.location,
            source_url: self.source_url,
        }
    }
}

/// Lifecycle status of a persisted activity. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Planning,
    Recruiting,
    VotingClosed,
    Confirmed,
    Completed,
    Cancelled,
}

impl ActivityStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Planning,
            Self::Recruiting,
            Self::VotingClosed,
            Self::Confirmed,
            Self::Completed,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Recruiting => "recruiting",
            Self::VotingClosed => "voting_closed",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Forward-only: each status may only move further down the chain, and
    /// Cancelled is reachable from any non-terminal status.
    pub fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Cancelled {
            return true;
        }
        let rank = |status: Self| {
            Self::ordered()
                .iter()
                .position(|s| *s == status)
                .unwrap_or(usize::MAX)
        };
        rank(next) > rank(self)
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A persisted outing. Does not own its route; owns its vote options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub route_id: RouteId,
    pub name: String,
    pub activity_date: Option<NaiveDate>,
    pub status: ActivityStatus,
    pub poster_path: Option<String>,
    pub vote_url: Option<String>,
    pub vote_deadline: Option<DateTime<Utc>>,
    /// "YYYY-M" label of the month the vote covered.
    pub vote_month: Option<String>,
    pub selected_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Activity fields known before the store assigns an identity.
#[derive(Debug, Clone)]
pub struct ActivityDraft {
    pub route_id: RouteId,
    pub name: String,
    pub activity_date: Option<NaiveDate>,
    pub status: ActivityStatus,
    pub poster_path: Option<String>,
    pub vote_url: Option<String>,
    pub vote_deadline: Option<DateTime<Utc>>,
    pub vote_month: Option<String>,
    pub selected_date: Option<NaiveDate>,
}

/// Partial update applied to a persisted activity; `None` leaves the field
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct ActivityPatch {
    pub activity_date: Option<NaiveDate>,
    pub status: Option<ActivityStatus>,
    pub poster_path: Option<String>,
    pub vote_url: Option<String>,
    pub vote_deadline: Option<DateTime<Utc>>,
    pub selected_date: Option<NaiveDate>,
}

/// A candidate activity date offered to voters, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOptionDraft {
    pub date: NaiveDate,
    /// Display label, "<date>（<two-char weekday>）".
    pub label: String,
    pub weather: String,
}

/// A persisted vote option, owned by its activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteOption {
    pub id: VoteOptionId,
    pub activity_id: ActivityId,
    pub date: NaiveDate,
    pub label: String,
    pub weather: String,
    pub vote_count: u32,
}

/// A frequently-asked question with a popularity counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    pub id: u64,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub click_count: u32,
}

/// A registered group member. External ids are unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: u64,
    pub external_id: String,
    pub name: Option<String>,
    pub role: String,
}

/// One line of group-chat history kept for the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMessage {
    pub id: u64,
    pub group_chat_id: String,
    pub user_id: String,
    pub text: String,
    pub is_bot: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_are_forward_only() {
        use ActivityStatus::*;

        assert!(Planning.can_advance_to(Recruiting));
        assert!(Recruiting.can_advance_to(Confirmed));
        assert!(!Confirmed.can_advance_to(Recruiting));
        assert!(!Recruiting.can_advance_to(Recruiting));
    }

    #[test]
    fn cancellation_is_reachable_from_any_non_terminal_status() {
        use ActivityStatus::*;

        for status in [Planning, Recruiting, VotingClosed, Confirmed] {
            assert!(status.can_advance_to(Cancelled), "{status} should cancel");
        }
        assert!(!Completed.can_advance_to(Cancelled));
        assert!(!Cancelled.can_advance_to(Planning));
    }

    #[test]
    fn tags_are_matched_on_exact_segments() {
        let route = Route {
            id: RouteId(1),
            name: "上方山森林徒步".to_string(),
            distance_km: 8.5,
            elevation_m: 350.0,
            duration_hours: 4.0,
            difficulty: Difficulty::Beginner,
            hot_score: 8.7,
            tags: "森林,亲子,轻松".to_string(),
            cover_url: String::new(),
            description: String::new(),
            location: "苏州上方山".to_string(),
            source_url: String::new(),
        };

        assert!(route.has_tag("亲子"));
        assert!(!route.has_tag("亲"));
    }
}
