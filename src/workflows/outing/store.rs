use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;

use super::domain::{
    Activity, ActivityDraft, ActivityId, ActivityPatch, ActivityStatus, FaqEntry, GroupMessage,
    Member, Route, RouteDraft, RouteId, VoteOption, VoteOptionDraft, VoteOptionId,
};

/// Route listing filters. Defaults mirror the "light hike" thresholds the
/// catalog is curated for: a day trip you finish before dark.
#[derive(Debug, Clone)]
pub struct RouteFilter {
    pub location: Option<String>,
    pub max_distance_km: f64,
    pub max_elevation_m: f64,
    pub max_duration_hours: f64,
}

impl Default for RouteFilter {
    fn default() -> Self {
        Self {
            location: None,
            max_distance_km: 15.0,
            max_elevation_m: 800.0,
            max_duration_hours: 6.0,
        }
    }
}

impl RouteFilter {
    pub fn for_location(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::default()
        }
    }

    fn matches(&self, route: &Route) -> bool {
        route.distance_km <= self.max_distance_km
            && route.elevation_m <= self.max_elevation_m
            && route.duration_hours <= self.max_duration_hours
            && self
                .location
                .as_deref()
                .map_or(true, |needle| route.location.contains(needle))
    }
}

/// Error enumeration for persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence contract consumed by the workflow and the tally. Backends
/// must serialize vote-count updates to the same option.
pub trait OutingStore: Send + Sync {
    fn insert_route(&self, draft: RouteDraft) -> Result<RouteId, StoreError>;
    fn get_route(&self, id: RouteId) -> Result<Option<Route>, StoreError>;
    /// Routes matching the filter, hot_score descending, paginated.
    fn list_routes(
        &self,
        filter: &RouteFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Route>, StoreError>;
    fn count_routes(&self, filter: &RouteFilter) -> Result<usize, StoreError>;

    fn insert_activity(&self, draft: ActivityDraft) -> Result<ActivityId, StoreError>;
    fn update_activity(&self, id: ActivityId, patch: ActivityPatch) -> Result<(), StoreError>;
    fn get_activity(&self, id: ActivityId) -> Result<Option<Activity>, StoreError>;
    fn latest_activity(&self) -> Result<Option<Activity>, StoreError>;

    /// Replaces any previously stored options for the activity, then inserts
    /// the given set in order. Regeneration therefore never duplicates rows.
    fn insert_vote_options(
        &self,
        activity_id: ActivityId,
        options: &[VoteOptionDraft],
    ) -> Result<Vec<VoteOptionId>, StoreError>;
    /// Options for the activity ordered by date ascending.
    fn list_vote_options(&self, activity_id: ActivityId) -> Result<Vec<VoteOption>, StoreError>;
    fn update_vote_count(&self, option_id: VoteOptionId, count: u32) -> Result<(), StoreError>;
    /// Highest vote count, ties broken by lowest option id.
    fn max_vote_option(&self, activity_id: ActivityId) -> Result<Option<VoteOption>, StoreError>;

    fn insert_faq(
        &self,
        question: &str,
        answer: &str,
        category: &str,
    ) -> Result<u64, StoreError>;
    /// All entries, most-clicked first.
    fn all_faq(&self) -> Result<Vec<FaqEntry>, StoreError>;
    /// Substring match against stored questions; a hit increments its
    /// click counter.
    fn lookup_faq(&self, query: &str) -> Result<Option<FaqEntry>, StoreError>;

    /// Registers a member; a duplicate external id is a no-op returning None.
    fn register_member(
        &self,
        external_id: &str,
        name: Option<&str>,
        role: &str,
    ) -> Result<Option<u64>, StoreError>;
    fn get_member(&self, external_id: &str) -> Result<Option<Member>, StoreError>;

    fn insert_message(
        &self,
        group_chat_id: &str,
        user_id: &str,
        text: &str,
        is_bot: bool,
    ) -> Result<u64, StoreError>;
    /// Newest first, capped at `limit`.
    fn recent_messages(
        &self,
        group_chat_id: &str,
        limit: usize,
    ) -> Result<Vec<GroupMessage>, StoreError>;
}

/// Order two vote options the way the winner is picked: vote count
/// descending, then id ascending. Lowest id equals earliest-created, which
/// under chronological insertion is the earliest date.
pub(crate) fn tally_order(a: &VoteOption, b: &VoteOption) -> Ordering {
    b.vote_count.cmp(&a.vote_count).then(a.id.cmp(&b.id))
}

#[derive(Default)]
struct MemoryState {
    routes: BTreeMap<u64, Route>,
    activities: BTreeMap<u64, Activity>,
    vote_options: BTreeMap<u64, VoteOption>,
    faq: BTreeMap<u64, FaqEntry>,
    members: BTreeMap<u64, Member>,
    messages: BTreeMap<u64, GroupMessage>,
    next_route_id: u64,
    next_activity_id: u64,
    next_option_id: u64,
    next_faq_id: u64,
    next_member_id: u64,
    next_message_id: u64,
}

impl MemoryState {
    fn next(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }
}

/// In-memory store used by the service, the CLI, and the tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> Result<T, StoreError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))?;
        Ok(f(&mut guard))
    }
}

impl OutingStore for MemoryStore {
    fn insert_route(&self, draft: RouteDraft) -> Result<RouteId, StoreError> {
        self.with_state(|state| {
            let id = RouteId(MemoryState::next(&mut state.next_route_id));
            state.routes.insert(id.0, draft.into_route(id));
            id
        })
    }

    fn get_route(&self, id: RouteId) -> Result<Option<Route>, StoreError> {
        self.with_state(|state| state.routes.get(&id.0).cloned())
    }

    fn list_routes(
        &self,
        filter: &RouteFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Route>, StoreError> {
        self.with_state(|state| {
            let mut matching: Vec<Route> = state
                .routes
                .values()
                .filter(|route| filter.matches(route))
                .cloned()
                .collect();
            matching.sort_by(|a, b| {
                b.hot_score
                    .partial_cmp(&a.hot_score)
                    .unwrap_or(Ordering::Equal)
                    .then(a.id.cmp(&b.id))
            });
            matching.into_iter().skip(offset).take(limit).collect()
        })
    }

    fn count_routes(&self, filter: &RouteFilter) -> Result<usize, StoreError> {
        self.with_state(|state| {
            state
                .routes
                .values()
                .filter(|route| filter.matches(route))
                .count()
        })
    }

    fn insert_activity(&self, draft: ActivityDraft) -> Result<ActivityId, StoreError> {
        self.with_state(|state| {
            let id = ActivityId(MemoryState::next(&mut state.next_activity_id));
            state.activities.insert(
                id.0,
                Activity {
                    id,
                    route_id: draft.route_id,
                    name: draft.name,
                    activity_date: draft.activity_date,
                    status: draft.status,
                    poster_path: draft.poster_path,
                    vote_url: draft.vote_url,
                    vote_deadline: draft.vote_deadline,
                    vote_month: draft.vote_month,
                    selected_date: draft.selected_date,
                    created_at: Utc::now(),
                },
            );
            id
        })
    }

    fn update_activity(&self, id: ActivityId, patch: ActivityPatch) -> Result<(), StoreError> {
        self.with_state(|state| match state.activities.get_mut(&id.0) {
            Some(activity) => {
                if let Some(date) = patch.activity_date {
                    activity.activity_date = Some(date);
                }
                if let Some(status) = patch.status {
                    activity.status = status;
                }
                if let Some(path) = patch.poster_path {
                    activity.poster_path = Some(path);
                }
                if let Some(url) = patch.vote_url {
                    activity.vote_url = Some(url);
                }
                if let Some(deadline) = patch.vote_deadline {
                    activity.vote_deadline = Some(deadline);
                }
                if let Some(date) = patch.selected_date {
                    activity.selected_date = Some(date);
                }
                Ok(())
            }
            None => Err(StoreError::NotFound),
        })?
    }

    fn get_activity(&self, id: ActivityId) -> Result<Option<Activity>, StoreError> {
        self.with_state(|state| state.activities.get(&id.0).cloned())
    }

    fn latest_activity(&self) -> Result<Option<Activity>, StoreError> {
        self.with_state(|state| state.activities.values().next_back().cloned())
    }

    fn insert_vote_options(
        &self,
        activity_id: ActivityId,
        options: &[VoteOptionDraft],
    ) -> Result<Vec<VoteOptionId>, StoreError> {
        self.with_state(|state| {
            state
                .vote_options
                .retain(|_, option| option.activity_id != activity_id);
            options
                .iter()
                .map(|draft| {
                    let id = VoteOptionId(MemoryState::next(&mut state.next_option_id));
                    state.vote_options.insert(
                        id.0,
                        VoteOption {
                            id,
                            activity_id,
                            date: draft.date,
                            label: draft.label.clone(),
                            weather: draft.weather.clone(),
                            vote_count: 0,
                        },
                    );
                    id
                })
                .collect()
        })
    }

    fn list_vote_options(&self, activity_id: ActivityId) -> Result<Vec<VoteOption>, StoreError> {
        self.with_state(|state| {
            let mut options: Vec<VoteOption> = state
                .vote_options
                .values()
                .filter(|option| option.activity_id == activity_id)
                .cloned()
                .collect();
            options.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
            options
        })
    }

    fn update_vote_count(&self, option_id: VoteOptionId, count: u32) -> Result<(), StoreError> {
        self.with_state(|state| match state.vote_options.get_mut(&option_id.0) {
            Some(option) => {
                option.vote_count = count;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        })?
    }

    fn max_vote_option(&self, activity_id: ActivityId) -> Result<Option<VoteOption>, StoreError> {
        self.with_state(|state| {
            state
                .vote_options
                .values()
                .filter(|option| option.activity_id == activity_id)
                .min_by(|a, b| tally_order(a, b))
                .cloned()
        })
    }

    fn insert_faq(
        &self,
        question: &str,
        answer: &str,
        category: &str,
    ) -> Result<u64, StoreError> {
        self.with_state(|state| {
            let id = MemoryState::next(&mut state.next_faq_id);
            state.faq.insert(
                id,
                FaqEntry {
                    id,
                    question: question.to_string(),
                    answer: answer.to_string(),
                    category: category.to_string(),
                    click_count: 0,
                },
            );
            id
        })
    }

    fn all_faq(&self) -> Result<Vec<FaqEntry>, StoreError> {
        self.with_state(|state| {
            let mut entries: Vec<FaqEntry> = state.faq.values().cloned().collect();
            entries.sort_by(|a, b| b.click_count.cmp(&a.click_count).then(a.id.cmp(&b.id)));
            entries
        })
    }

    fn lookup_faq(&self, query: &str) -> Result<Option<FaqEntry>, StoreError> {
        if query.trim().is_empty() {
            return Ok(None);
        }
        self.with_state(|state| {
            let hit = state
                .faq
                .values()
                .find(|entry| entry.question.contains(query))
                .map(|entry| entry.id)?;
            let entry = state.faq.get_mut(&hit)?;
            entry.click_count += 1;
            Some(entry.clone())
        })
    }

    fn register_member(
        &self,
        external_id: &str,
        name: Option<&str>,
        role: &str,
    ) -> Result<Option<u64>, StoreError> {
        self.with_state(|state| {
            let exists = state
                .members
                .values()
                .any(|member| member.external_id == external_id);
            if exists {
                return None;
            }
            let id = MemoryState::next(&mut state.next_member_id);
            state.members.insert(
                id,
                Member {
                    id,
                    external_id: external_id.to_string(),
                    name: name.map(str::to_string),
                    role: role.to_string(),
                },
            );
            Some(id)
        })
    }

    fn get_member(&self, external_id: &str) -> Result<Option<Member>, StoreError> {
        self.with_state(|state| {
            state
                .members
                .values()
                .find(|member| member.external_id == external_id)
                .cloned()
        })
    }

    fn insert_message(
        &self,
        group_chat_id: &str,
        user_id: &str,
        text: &str,
        is_bot: bool,
    ) -> Result<u64, StoreError> {
        self.with_state(|state| {
            let id = MemoryState::next(&mut state.next_message_id);
            state.messages.insert(
                id,
                GroupMessage {
                    id,
                    group_chat_id: group_chat_id.to_string(),
                    user_id: user_id.to_string(),
                    text: text.to_string(),
                    is_bot,
                },
            );
            id
        })
    }

    fn recent_messages(
        &self,
        group_chat_id: &str,
        limit: usize,
    ) -> Result<Vec<GroupMessage>, StoreError> {
        self.with_state(|state| {
            state
                .messages
                .values()
                .rev()
                .filter(|message| message.group_chat_id == group_chat_id)
                .take(limit)
                .cloned()
                .collect()
        })
    }
}
