use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use image::DynamicImage;
use serde::Serialize;

use super::domain::{
    ActivityDraft, ActivityId, ActivityPatch, ActivityStatus, Route, RouteId, VoteOption,
    VoteOptionDraft,
};
use super::notify::{publication_message, welcome_message, DeliveryError, MessageGateway};
use super::poster::{PosterCompositor, PosterError};
use super::schedule::VoteOptionGenerator;
use super::store::{OutingStore, StoreError};
use super::weather::ForecastGateway;
use super::{tally, themes};

/// Stages of one outing draft, strictly forward. `Cancelled` is reachable
/// from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutingStage {
    Draft,
    RouteSelected,
    ThemeChosen,
    BackgroundChosen,
    VoteOptionsGenerated,
    DeadlineSet,
    PosterGenerated,
    Published,
    DateDecided,
    GroupCreated,
    Cancelled,
}

impl OutingStage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::RouteSelected => "route_selected",
            Self::ThemeChosen => "theme_chosen",
            Self::BackgroundChosen => "background_chosen",
            Self::VoteOptionsGenerated => "vote_options_generated",
            Self::DeadlineSet => "deadline_set",
            Self::PosterGenerated => "poster_generated",
            Self::Published => "published",
            Self::DateDecided => "date_decided",
            Self::GroupCreated => "group_created",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::GroupCreated | Self::Cancelled)
    }
}

impl fmt::Display for OutingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("cannot {operation} at stage {found}; requires {requires}")]
    Precondition {
        operation: &'static str,
        found: OutingStage,
        requires: OutingStage,
    },
    #[error("route {0} is not in the catalog")]
    RouteNotFound(RouteId),
    #[error("activity {0} does not exist")]
    ActivityNotFound(ActivityId),
    #[error("theme text must not be empty")]
    EmptyTheme,
    #[error("{year}-{month} is not a calendar month")]
    InvalidMonth { year: i32, month: u32 },
    #[error("vote deadline {0} is not in the future")]
    DeadlineNotInFuture(DateTime<Utc>),
    #[error("date {0} is not one of the offered vote options")]
    DateNotOffered(NaiveDate),
    #[error("no vote counts available to tally")]
    NoVotesRecorded,
    #[error("activity status may not move from {from} to {to}")]
    StatusRegression {
        from: ActivityStatus,
        to: ActivityStatus,
    },
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Poster(#[from] PosterError),
}

/// Poster output of the draft, pointing at the rendered file and the vote
/// link it encodes.
#[derive(Debug, Clone)]
pub struct PosterArtifact {
    pub path: PathBuf,
    pub vote_url: String,
}

#[derive(Default)]
struct OutingDraft {
    route: Option<Route>,
    theme: Option<String>,
    background: Option<DynamicImage>,
    options: Vec<VoteOptionDraft>,
    vote_month: Option<(i32, u32)>,
    deadline: Option<DateTime<Utc>>,
    poster: Option<PosterArtifact>,
    selected_date: Option<NaiveDate>,
}

/// The stage-gated orchestrator for one outing. All in-progress artifacts
/// live in this context; nothing becomes durable before [`create_group`].
///
/// [`create_group`]: OutingWorkflow::create_group
pub struct OutingWorkflow<S> {
    store: Arc<S>,
    generator: VoteOptionGenerator,
    messenger: Box<dyn MessageGateway>,
    compositor: PosterCompositor,
    assets_dir: PathBuf,
    stage: OutingStage,
    draft: OutingDraft,
}

impl<S: OutingStore> OutingWorkflow<S> {
    pub fn new(
        store: Arc<S>,
        forecast: Box<dyn ForecastGateway>,
        messenger: Box<dyn MessageGateway>,
        assets_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            generator: VoteOptionGenerator::new(forecast),
            messenger,
            compositor: PosterCompositor::new(),
            assets_dir: assets_dir.into(),
            stage: OutingStage::Draft,
            draft: OutingDraft::default(),
        }
    }

    pub fn stage(&self) -> OutingStage {
        self.stage
    }

    pub fn route(&self) -> Option<&Route> {
        self.draft.route.as_ref()
    }

    pub fn vote_options(&self) -> &[VoteOptionDraft] {
        &self.draft.options
    }

    pub fn poster(&self) -> Option<&PosterArtifact> {
        self.draft.poster.as_ref()
    }

    /// Each operation may run when the workflow sits at the stage it
    /// produces (idempotent re-invocation) or at the stage directly before
    /// it; anything else is a precondition violation.
    fn ensure_stage(
        &self,
        operation: &'static str,
        requires: OutingStage,
        produces: OutingStage,
    ) -> Result<(), WorkflowError> {
        if self.stage == requires || self.stage == produces {
            Ok(())
        } else {
            Err(WorkflowError::Precondition {
                operation,
                found: self.stage,
                requires,
            })
        }
    }

    /// Anchor the draft on a catalog route.
    pub fn select_route(&mut self, route_id: RouteId) -> Result<&Route, WorkflowError> {
        self.ensure_stage("select_route", OutingStage::Draft, OutingStage::RouteSelected)?;
        let route = self
            .store
            .get_route(route_id)?
            .ok_or(WorkflowError::RouteNotFound(route_id))?;
        self.draft.route = Some(route);
        self.stage = OutingStage::RouteSelected;
        Ok(self.draft.route.as_ref().expect("route just stored"))
    }

    /// Theme candidates for the selected route, per the fixed rule table.
    pub fn theme_suggestions(&self) -> Result<Vec<String>, WorkflowError> {
        match &self.draft.route {
            Some(route) => Ok(themes::suggest(route)),
            None => Err(WorkflowError::Precondition {
                operation: "theme_suggestions",
                found: self.stage,
                requires: OutingStage::RouteSelected,
            }),
        }
    }

    /// Accepts a suggested theme or free text.
    pub fn choose_theme(&mut self, theme: impl Into<String>) -> Result<(), WorkflowError> {
        self.ensure_stage(
            "choose_theme",
            OutingStage::RouteSelected,
            OutingStage::ThemeChosen,
        )?;
        let theme = theme.into();
        if theme.trim().is_empty() {
            return Err(WorkflowError::EmptyTheme);
        }
        self.draft.theme = Some(theme);
        self.stage = OutingStage::ThemeChosen;
        Ok(())
    }

    /// Accepts a provider-searched or user-supplied background image.
    pub fn choose_background(&mut self, image: DynamicImage) -> Result<(), WorkflowError> {
        self.ensure_stage(
            "choose_background",
            OutingStage::ThemeChosen,
            OutingStage::BackgroundChosen,
        )?;
        self.draft.background = Some(image);
        self.stage = OutingStage::BackgroundChosen;
        Ok(())
    }

    /// Build the month's weekend options. Re-invocation overwrites the
    /// draft set; persisted rows are only written at group creation, where
    /// any prior rows for the activity are replaced.
    pub fn generate_vote_options(
        &mut self,
        year: i32,
        month: u32,
        location: &str,
    ) -> Result<&[VoteOptionDraft], WorkflowError> {
        self.ensure_stage(
            "generate_vote_options",
            OutingStage::BackgroundChosen,
            OutingStage::VoteOptionsGenerated,
        )?;
        let options = self.generator.generate(year, month, location);
        if options.is_empty() {
            return Err(WorkflowError::InvalidMonth { year, month });
        }
        self.draft.options = options;
        self.draft.vote_month = Some((year, month));
        self.stage = OutingStage::VoteOptionsGenerated;
        Ok(&self.draft.options)
    }

    pub fn set_deadline(&mut self, deadline: DateTime<Utc>) -> Result<(), WorkflowError> {
        self.ensure_stage(
            "set_deadline",
            OutingStage::VoteOptionsGenerated,
            OutingStage::DeadlineSet,
        )?;
        if deadline <= Utc::now() {
            return Err(WorkflowError::DeadlineNotInFuture(deadline));
        }
        self.draft.deadline = Some(deadline);
        self.stage = OutingStage::DeadlineSet;
        Ok(())
    }

    /// Render the poster into the assets directory and record the vote URL
    /// it encodes.
    pub fn generate_poster(
        &mut self,
        vote_url: impl Into<String>,
    ) -> Result<&PosterArtifact, WorkflowError> {
        self.ensure_stage(
            "generate_poster",
            OutingStage::DeadlineSet,
            OutingStage::PosterGenerated,
        )?;
        let vote_url = vote_url.into();
        let route = self.draft.route.as_ref().expect("route set before deadline");
        let theme = self.draft.theme.as_deref().expect("theme set before deadline");
        let background = self
            .draft
            .background
            .as_ref()
            .expect("background set before deadline");

        let filename = format!("poster_{}.png", Utc::now().timestamp());
        let path = self.assets_dir.join(filename);
        self.compositor.compose_to_file(
            route,
            theme,
            background,
            &vote_url,
            &self.draft.options,
            &path,
        )?;

        self.draft.poster = Some(PosterArtifact { path, vote_url });
        self.stage = OutingStage::PosterGenerated;
        Ok(self.draft.poster.as_ref().expect("poster just stored"))
    }

    /// Deliver the poster and vote link to the group channel. On failure
    /// the stage does not advance; the caller decides whether to retry.
    pub fn publish(&mut self) -> Result<(), WorkflowError> {
        self.ensure_stage(
            "publish",
            OutingStage::PosterGenerated,
            OutingStage::PosterGenerated,
        )?;
        let poster = self.draft.poster.as_ref().expect("poster artifact present");
        self.messenger
            .send_image(&poster.path.display().to_string())?;
        self.messenger
            .send_markdown(&publication_message(&poster.vote_url))?;
        self.stage = OutingStage::Published;
        Ok(())
    }

    /// Manually settle the activity date; it must be one of the offered
    /// options.
    pub fn decide_date(&mut self, selected: NaiveDate) -> Result<(), WorkflowError> {
        self.ensure_stage("decide_date", OutingStage::Published, OutingStage::DateDecided)?;
        if !self.draft.options.iter().any(|option| option.date == selected) {
            return Err(WorkflowError::DateNotOffered(selected));
        }
        self.draft.selected_date = Some(selected);
        self.stage = OutingStage::DateDecided;
        Ok(())
    }

    /// Settle the date from counted options (e.g. rows the voting platform
    /// reported), using the deterministic tally.
    pub fn decide_date_from_counts(
        &mut self,
        counted: &[VoteOption],
    ) -> Result<NaiveDate, WorkflowError> {
        self.ensure_stage(
            "decide_date",
            OutingStage::Published,
            OutingStage::DateDecided,
        )?;
        let winner = tally::winner(counted).ok_or(WorkflowError::NoVotesRecorded)?;
        let date = winner.date;
        self.decide_date(date)?;
        Ok(date)
    }

    /// Make the draft durable: persist the activity and its option set,
    /// then send the welcome message. The single point of persistence.
    pub fn create_group(&mut self) -> Result<ActivityId, WorkflowError> {
        self.ensure_stage("create_group", OutingStage::DateDecided, OutingStage::DateDecided)?;

        let route = self.draft.route.as_ref().expect("route decided");
        let selected = self.draft.selected_date.expect("date decided");
        let (year, month) = self.draft.vote_month.expect("vote month recorded");
        let poster = self.draft.poster.as_ref().expect("poster generated");
        let date_label = self
            .draft
            .options
            .iter()
            .find(|option| option.date == selected)
            .map(|option| option.label.clone())
            .expect("selected date validated against options");

        // Welcome delivery gates persistence, so a failed send leaves the
        // workflow retryable with nothing half-written.
        self.messenger
            .send_markdown(&welcome_message(route, &date_label))?;

        let activity_id = self.store.insert_activity(ActivityDraft {
            route_id: route.id,
            name: format!("{} - {}", route.name, date_label),
            activity_date: Some(selected),
            status: ActivityStatus::Recruiting,
            poster_path: Some(poster.path.display().to_string()),
            vote_url: Some(poster.vote_url.clone()),
            vote_deadline: self.draft.deadline,
            vote_month: Some(format!("{year}-{month}")),
            selected_date: Some(selected),
        })?;
        self.store
            .insert_vote_options(activity_id, &self.draft.options)?;

        tracing::info!(%activity_id, route = %route.name, "outing group created");
        self.stage = OutingStage::GroupCreated;
        Ok(activity_id)
    }

    /// Abandon the draft. Allowed from any non-terminal stage.
    pub fn cancel(&mut self) -> Result<(), WorkflowError> {
        if self.stage.is_terminal() {
            return Err(WorkflowError::Precondition {
                operation: "cancel",
                found: self.stage,
                requires: OutingStage::Draft,
            });
        }
        self.stage = OutingStage::Cancelled;
        Ok(())
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }
}

/// Advance a persisted activity's status, enforcing the forward-only chain
/// and the deadline invariant (no advancing past recruiting without a vote
/// deadline on record).
pub fn advance_activity_status<S: OutingStore>(
    store: &S,
    id: ActivityId,
    next: ActivityStatus,
) -> Result<(), WorkflowError> {
    let activity = store
        .get_activity(id)?
        .ok_or(WorkflowError::ActivityNotFound(id))?;
    if !activity.status.can_advance_to(next) {
        return Err(WorkflowError::StatusRegression {
            from: activity.status,
            to: next,
        });
    }
    let past_recruiting = matches!(
        next,
        ActivityStatus::VotingClosed | ActivityStatus::Confirmed | ActivityStatus::Completed
    );
    if past_recruiting && activity.vote_deadline.is_none() {
        return Err(WorkflowError::Precondition {
            operation: "advance_status",
            found: OutingStage::GroupCreated,
            requires: OutingStage::DeadlineSet,
        });
    }
    store.update_activity(
        id,
        ActivityPatch {
            status: Some(next),
            ..ActivityPatch::default()
        },
    )?;
    Ok(())
}
