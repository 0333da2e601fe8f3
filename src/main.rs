use axum::extract::{Extension, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Datelike, Duration, Local, Utc};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use trailplan::config::AppConfig;
use trailplan::error::AppError;
use trailplan::telemetry;
use trailplan::workflows::outing::discovery::seed_catalog;
use trailplan::workflows::outing::domain::{Route, RouteId, VoteOptionDraft};
use trailplan::workflows::outing::faq::init_faq;
use trailplan::workflows::outing::notify::WeComBot;
use trailplan::workflows::outing::schedule::VoteOptionGenerator;
use trailplan::workflows::outing::store::{MemoryStore, OutingStore, RouteFilter};
use trailplan::workflows::outing::weather::{ForecastGateway, OfflineForecast, QWeatherClient};
use trailplan::workflows::outing::{OutingWorkflow, WorkflowError};

type SharedStore = Arc<MemoryStore>;

#[derive(Clone)]
struct InfraState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Trailplan Outing Orchestrator",
    about = "Run the hiking-outing orchestrator as a service or drive it from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the weekend vote options for a month
    Schedule(ScheduleArgs),
    /// Load the built-in route catalog and report inserted/skipped counts
    Seed,
    /// Walk one outing draft through every stage for demo purposes
    Plan(PlanArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct ScheduleArgs {
    #[arg(long)]
    year: i32,
    #[arg(long)]
    month: u32,
    #[arg(long, default_value = "苏州")]
    location: String,
    /// Query the live forecast provider instead of the offline sentinel
    #[arg(long)]
    live: bool,
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// Vote month year (defaults to next month)
    #[arg(long)]
    year: Option<i32>,
    /// Vote month (defaults to next month)
    #[arg(long)]
    month: Option<u32>,
    #[arg(long, default_value = "苏州")]
    location: String,
    /// Vote link encoded in the poster (defaults to a timestamped demo URL)
    #[arg(long)]
    vote_url: Option<String>,
    /// Days from now until the vote closes
    #[arg(long, default_value_t = 5)]
    deadline_days: i64,
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_server(args))
        }
        Command::Schedule(args) => run_schedule(args),
        Command::Seed => run_seed(),
        Command::Plan(args) => run_plan(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let store: SharedStore = Arc::new(MemoryStore::new());
    let seeded = seed_catalog(store.as_ref()).map_err(WorkflowError::Store)?;
    let faq_loaded = init_faq(store.as_ref()).map_err(WorkflowError::Store)?;
    info!(
        inserted = seeded.inserted,
        skipped = seeded.skipped,
        faq = faq_loaded,
        "catalog and question bank ready"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let infra = InfraState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/routes", get(list_routes_endpoint))
        .route("/api/v1/schedule/preview", post(schedule_preview_endpoint))
        .route("/api/v1/themes/suggest", post(theme_suggest_endpoint))
        .layer(prometheus_layer)
        .layer(Extension(infra))
        .with_state(store);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "outing orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_schedule(args: ScheduleArgs) -> Result<(), AppError> {
    let generator = if args.live {
        let config = AppConfig::load()?;
        match QWeatherClient::new(config.weather.api_key) {
            Ok(client) => VoteOptionGenerator::new(Box::new(client)),
            Err(err) => {
                eprintln!("forecast client unavailable ({err}); using offline sentinel");
                VoteOptionGenerator::new(Box::new(OfflineForecast))
            }
        }
    } else {
        VoteOptionGenerator::new(Box::new(OfflineForecast))
    };

    let options = generator.generate(args.year, args.month, &args.location);
    if options.is_empty() {
        return Err(WorkflowError::InvalidMonth {
            year: args.year,
            month: args.month,
        }
        .into());
    }

    println!(
        "Weekend vote options for {}-{} ({})",
        args.year, args.month, args.location
    );
    for option in options {
        println!("- {}：{}", option.label, option.weather);
    }
    Ok(())
}

fn run_seed() -> Result<(), AppError> {
    let store = MemoryStore::new();
    let report = seed_catalog(&store).map_err(WorkflowError::Store)?;
    println!(
        "Catalog seeding: {} inserted, {} skipped, {} total",
        report.inserted, report.skipped, report.total
    );

    for location in ["苏州", "上海"] {
        println!("\nTop routes around {location} (hot score descending)");
        let routes = store
            .list_routes(&RouteFilter::for_location(location), 100, 0)
            .map_err(WorkflowError::Store)?;
        for route in routes {
            println!(
                "- {} | {}公里 | 爬升{}米 | {}小时 | {} | 热度{:.1}",
                route.name,
                route.distance_km,
                route.elevation_m,
                route.duration_hours,
                route.difficulty.label(),
                route.hot_score
            );
        }
    }
    Ok(())
}

fn run_plan(args: PlanArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store: SharedStore = Arc::new(MemoryStore::new());
    seed_catalog(store.as_ref()).map_err(WorkflowError::Store)?;

    let (default_year, default_month) = next_month(Local::now().date_naive());
    let year = args.year.unwrap_or(default_year);
    let month = args.month.unwrap_or(default_month);

    let forecast: Box<dyn ForecastGateway> = match QWeatherClient::new(config.weather.api_key) {
        Ok(client) => Box::new(client),
        Err(_) => Box::new(OfflineForecast),
    };
    let messenger = WeComBot::new(config.messaging.webhook_url)
        .map_err(WorkflowError::Delivery)?;

    let mut workflow = OutingWorkflow::new(
        store.clone(),
        forecast,
        Box::new(messenger),
        config.poster.assets_dir.clone(),
    );

    let top = store
        .list_routes(&RouteFilter::for_location(&args.location), 1, 0)
        .map_err(WorkflowError::Store)?
        .into_iter()
        .next()
        .ok_or(WorkflowError::RouteNotFound(RouteId(0)))?;
    let route = workflow.select_route(top.id)?;
    println!("Route selected: {}", route.name);

    let suggestions = workflow.theme_suggestions()?;
    let theme = suggestions.first().cloned().unwrap_or_else(|| "山野徒步".to_string());
    workflow.choose_theme(theme.as_str())?;
    println!("Theme chosen: {theme}");

    workflow.choose_background(demo_background())?;
    let options = workflow.generate_vote_options(year, month, &args.location)?;
    println!("Vote options generated: {}", options.len());

    workflow.set_deadline(Utc::now() + Duration::days(args.deadline_days))?;

    let vote_url = args
        .vote_url
        .unwrap_or_else(|| format!("https://example.com/vote/{}", Utc::now().timestamp()));
    let artifact = workflow.generate_poster(vote_url)?;
    println!("Poster written to {}", artifact.path.display());

    match workflow.publish() {
        Ok(()) => println!("Poster published to the group channel"),
        Err(err) => {
            println!("Publication failed ({err}); workflow stays at {}", workflow.stage());
            return Ok(());
        }
    }

    let first_date = workflow.vote_options()[0].date;
    workflow.decide_date(first_date)?;
    let activity_id = workflow.create_group()?;
    println!("Activity {activity_id} persisted with status recruiting");
    Ok(())
}

fn next_month(today: chrono::NaiveDate) -> (i32, u32) {
    if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    }
}

/// Solid-gradient stand-in for a searched or uploaded background image.
fn demo_background() -> image::DynamicImage {
    let image = image::RgbaImage::from_fn(1080, 1920, |_, y| {
        let shade = 80 + (y * 100 / 1920) as u8;
        image::Rgba([40, shade, 90, 255])
    });
    image::DynamicImage::ImageRgba8(image)
}

#[derive(Debug, Deserialize)]
struct RouteListParams {
    location: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    3
}

#[derive(Debug, Serialize)]
struct RouteListResponse {
    total: usize,
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct SchedulePreviewRequest {
    year: i32,
    month: u32,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Serialize)]
struct SchedulePreviewResponse {
    month_label: String,
    options: Vec<VoteOptionDraft>,
}

#[derive(Debug, Deserialize)]
struct ThemeSuggestRequest {
    route_id: u64,
}

#[derive(Debug, Serialize)]
struct ThemeSuggestResponse {
    route: String,
    themes: Vec<String>,
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(Extension(infra): Extension<InfraState>) -> impl IntoResponse {
    let ready = infra.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(Extension(infra): Extension<InfraState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        infra.metrics.render(),
    )
}

async fn list_routes_endpoint(
    State(store): State<SharedStore>,
    Query(params): Query<RouteListParams>,
) -> Result<Json<RouteListResponse>, AppError> {
    let filter = RouteFilter {
        location: params.location,
        ..RouteFilter::default()
    };
    let total = store.count_routes(&filter).map_err(WorkflowError::Store)?;
    let routes = store
        .list_routes(&filter, params.limit, params.offset)
        .map_err(WorkflowError::Store)?;
    Ok(Json(RouteListResponse { total, routes }))
}

/// Weekend preview with degraded forecast data; live lookups stay on the
/// blocking CLI path.
async fn schedule_preview_endpoint(
    Json(payload): Json<SchedulePreviewRequest>,
) -> Result<Json<SchedulePreviewResponse>, AppError> {
    let generator = VoteOptionGenerator::new(Box::new(OfflineForecast));
    let location = payload.location.unwrap_or_else(|| "苏州".to_string());
    let options = generator.generate(payload.year, payload.month, &location);
    if options.is_empty() {
        return Err(WorkflowError::InvalidMonth {
            year: payload.year,
            month: payload.month,
        }
        .into());
    }
    Ok(Json(SchedulePreviewResponse {
        month_label: format!("{}-{}", payload.year, payload.month),
        options,
    }))
}

async fn theme_suggest_endpoint(
    State(store): State<SharedStore>,
    Json(payload): Json<ThemeSuggestRequest>,
) -> Result<Json<ThemeSuggestResponse>, AppError> {
    let route_id = RouteId(payload.route_id);
    let route = store
        .get_route(route_id)
        .map_err(WorkflowError::Store)?
        .ok_or(WorkflowError::RouteNotFound(route_id))?;
    Ok(Json(ThemeSuggestResponse {
        themes: trailplan::workflows::outing::themes::suggest(&route),
        route: route.name,
    }))
}
