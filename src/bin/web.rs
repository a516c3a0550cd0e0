//! HTTP command surface for the bracket service. A chat-bot gateway forwards
//! each user command here with the acting user in the body.
//! Run with: cargo run --bin web
//! Configure with env: HOST, PORT, DATA_FILE, DATA_BACKUP, RP_1ST..RP_4TH.

use actix_web::{
    delete, get, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use scoped_bracket::config::AppConfig;
use scoped_bracket::render::{leaderboard_csv, TextNotifier};
use scoped_bracket::service::ServiceResult;
use scoped_bracket::storage::{JsonFile, JsonFileStore};
use scoped_bracket::{
    Actor, Capability, Participant, RewardTable, RoleAuthorizer, ServiceError,
    TournamentService, TournamentSettings,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared by every worker.
struct AppContext {
    service: TournamentService,
    notifier: Arc<TextNotifier>,
    config: AppConfig,
}

type AppState = Data<AppContext>;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

/// Path segment: scope id (e.g. /api/scopes/{scope}/tournament)
#[derive(Deserialize)]
struct ScopePath {
    scope: String,
}

#[derive(Deserialize)]
struct ActorBody {
    actor: Actor,
}

#[derive(Deserialize)]
struct ConfigureBody {
    actor: Actor,
    title: String,
    max_participants: usize,
    map: Option<String>,
    abilities: Option<String>,
    prize: Option<String>,
    rewards: Option<RewardTable>,
}

#[derive(Deserialize)]
struct FillerBody {
    actor: Actor,
    name: String,
}

#[derive(Deserialize)]
struct WinnerBody {
    actor: Actor,
    participant_id: String,
}

/// A chat member targeted by a moderator command.
#[derive(Deserialize)]
struct Target {
    id: String,
    name: String,
}

impl Target {
    fn participant(&self) -> Participant {
        Participant::real(self.id.clone(), self.name.clone())
    }
}

#[derive(Deserialize)]
struct AmountBody {
    actor: Actor,
    target: Target,
    amount: i64,
}

#[derive(Deserialize)]
struct TagBody {
    actor: Actor,
    target: Target,
    tag: String,
}

#[derive(Deserialize)]
struct RemoveTagBody {
    actor: Actor,
    participant_id: String,
    /// None removes every tag.
    tag: Option<String>,
}

#[derive(Deserialize)]
struct PermissionBody {
    actor: Actor,
    capability: Capability,
    role: String,
}

#[derive(Deserialize)]
struct ChannelBody {
    actor: Actor,
    channel: Option<String>,
}

#[derive(Serialize)]
struct Changed {
    changed: bool,
}

#[derive(Serialize)]
struct Total {
    total: i64,
}

#[derive(Serialize)]
struct RosterSize {
    roster_size: usize,
}

fn service_error(e: ServiceError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        ServiceError::Unauthorized { .. } | ServiceError::AdministratorOnly => {
            HttpResponse::Forbidden().json(body)
        }
        ServiceError::Engine(_) => HttpResponse::BadRequest().json(body),
        ServiceError::Store(_) => HttpResponse::InternalServerError().json(body),
    }
}

/// Run a service command off the async workers (store writes hit the disk)
/// and turn the result into a response.
async fn run<T, F>(state: &AppState, command: F) -> HttpResponse
where
    T: Serialize + Send + 'static,
    F: FnOnce(&AppContext) -> ServiceResult<T> + Send + 'static,
{
    let ctx = state.clone();
    match tokio::task::spawn_blocking(move || command(&ctx)).await {
        Ok(Ok(value)) => HttpResponse::Ok().json(value),
        Ok(Err(e)) => service_error(e),
        Err(e) => {
            log::error!("command task failed: {}", e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "error": "internal error" }))
        }
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "scoped-bracket",
    })
}

/// Current tournament for the scope (Idle if nothing is running).
#[get("/api/scopes/{scope}/tournament")]
async fn api_get_tournament(state: AppState, path: Path<ScopePath>) -> HttpResponse {
    HttpResponse::Ok().json(state.service.tournament(&path.scope))
}

/// Last finished tournament (404 if none yet).
#[get("/api/scopes/{scope}/results")]
async fn api_last_result(state: AppState, path: Path<ScopePath>) -> HttpResponse {
    match state.service.last_result(&path.scope) {
        Some(result) => HttpResponse::Ok().json(result),
        None => HttpResponse::NotFound()
            .json(serde_json::json!({ "error": "No finished tournament" })),
    }
}

/// Set title, cap, map, abilities, prize and rewards (Idle or Configuring).
#[post("/api/scopes/{scope}/configure")]
async fn api_configure(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<ConfigureBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    let body = body.into_inner();
    let defaults = TournamentSettings::default();
    let settings = TournamentSettings {
        title: body.title,
        map: body.map.unwrap_or(defaults.map),
        abilities: body.abilities.unwrap_or(defaults.abilities),
        max_participants: body.max_participants,
        prize: body.prize.unwrap_or(defaults.prize),
        rewards: body.rewards.unwrap_or(state.config.default_rewards),
    };
    run(&state, move |ctx| {
        ctx.service.configure(&body.actor, &scope, settings)?;
        Ok(ctx.service.tournament(&scope))
    })
    .await
}

/// Open registration (Configuring -> Registering).
#[post("/api/scopes/{scope}/open")]
async fn api_open_registration(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<ActorBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        ctx.service.open_registration(&body.actor, &scope)?;
        Ok(ctx.service.tournament(&scope))
    })
    .await
}

/// The acting user registers themselves.
#[post("/api/scopes/{scope}/register")]
async fn api_register(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<ActorBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        let roster_size = ctx.service.register(&body.actor, &scope)?;
        Ok(RosterSize { roster_size })
    })
    .await
}

/// The acting user leaves before the start.
#[post("/api/scopes/{scope}/unregister")]
async fn api_unregister(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<ActorBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        let roster_size = ctx.service.unregister(&body.actor, &scope)?;
        Ok(RosterSize { roster_size })
    })
    .await
}

/// Add a bye-filler entrant.
#[post("/api/scopes/{scope}/fillers")]
async fn api_add_filler(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<FillerBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| ctx.service.add_bye_filler(&body.actor, &scope, body.name.trim())).await
}

/// Start the bracket; returns round 1.
#[post("/api/scopes/{scope}/start")]
async fn api_start(state: AppState, path: Path<ScopePath>, body: Json<ActorBody>) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| ctx.service.start(&body.actor, &scope)).await
}

/// Record a match winner.
#[post("/api/scopes/{scope}/winner")]
async fn api_record_winner(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<WinnerBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        ctx.service
            .record_winner(&body.actor, &scope, &body.participant_id)
    })
    .await
}

/// Cancel whatever is running in the scope.
#[post("/api/scopes/{scope}/cancel")]
async fn api_cancel(state: AppState, path: Path<ScopePath>, body: Json<ActorBody>) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        ctx.service.cancel(&body.actor, &scope)?;
        Ok(ctx.service.tournament(&scope))
    })
    .await
}

#[get("/api/scopes/{scope}/leaderboard")]
async fn api_leaderboard(state: AppState, path: Path<ScopePath>) -> HttpResponse {
    HttpResponse::Ok().json(state.service.leaderboard(&path.scope))
}

/// Trophy holders only, most trophies first.
#[get("/api/scopes/{scope}/leaderboard/trophies")]
async fn api_trophy_leaderboard(state: AppState, path: Path<ScopePath>) -> HttpResponse {
    HttpResponse::Ok().json(state.service.trophy_leaderboard(&path.scope))
}

#[get("/api/scopes/{scope}/leaderboard.csv")]
async fn api_leaderboard_csv(state: AppState, path: Path<ScopePath>) -> HttpResponse {
    match leaderboard_csv(&state.service.leaderboard(&path.scope)) {
        Ok(csv) => HttpResponse::Ok().content_type("text/csv; charset=utf-8").body(csv),
        Err(e) => HttpResponse::InternalServerError()
            .json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// Latest text rendered for the scope, for relaying into chat.
#[get("/api/scopes/{scope}/rendered")]
async fn api_rendered(state: AppState, path: Path<ScopePath>) -> HttpResponse {
    match state.notifier.latest(&path.scope) {
        Some(text) => HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(text),
        None => HttpResponse::NoContent().finish(),
    }
}

/// Add or (negative amount) remove points.
#[post("/api/scopes/{scope}/points")]
async fn api_points(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<AmountBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        let total = ctx
            .service
            .adjust_points(&body.actor, &scope, &body.target.participant(), body.amount)?;
        Ok(Total { total })
    })
    .await
}

/// Add or (negative amount) remove trophies.
#[post("/api/scopes/{scope}/trophies")]
async fn api_trophies(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<AmountBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        let total = ctx
            .service
            .adjust_trophies(&body.actor, &scope, &body.target.participant(), body.amount)?;
        Ok(Total { total })
    })
    .await
}

#[post("/api/scopes/{scope}/tags")]
async fn api_add_tag(state: AppState, path: Path<ScopePath>, body: Json<TagBody>) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        let changed = ctx
            .service
            .add_tag(&body.actor, &scope, &body.target.participant(), &body.tag)?;
        Ok(Changed { changed })
    })
    .await
}

#[delete("/api/scopes/{scope}/tags")]
async fn api_remove_tag(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<RemoveTagBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        let changed = ctx.service.remove_tag(
            &body.actor,
            &scope,
            &body.participant_id,
            body.tag.as_deref(),
        )?;
        Ok(Changed { changed })
    })
    .await
}

/// Wipe points, trophies and tags for the scope.
#[post("/api/scopes/{scope}/stats/reset")]
async fn api_reset_stats(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<ActorBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        ctx.service.reset_stats(&body.actor, &scope)?;
        Ok(ctx.service.leaderboard(&scope))
    })
    .await
}

/// Roles granted each capability, keyed by capability name.
#[get("/api/scopes/{scope}/permissions")]
async fn api_permissions(state: AppState, path: Path<ScopePath>) -> HttpResponse {
    let grants: BTreeMap<&str, Vec<String>> = Capability::ALL
        .into_iter()
        .map(|c| (c.as_str(), state.service.granted_roles(&path.scope, c)))
        .collect();
    HttpResponse::Ok().json(grants)
}

#[post("/api/scopes/{scope}/permissions")]
async fn api_grant(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<PermissionBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        let changed = ctx
            .service
            .grant_capability(&body.actor, &scope, body.capability, &body.role)?;
        Ok(Changed { changed })
    })
    .await
}

#[delete("/api/scopes/{scope}/permissions")]
async fn api_revoke(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<PermissionBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        let changed = ctx
            .service
            .revoke_capability(&body.actor, &scope, body.capability, &body.role)?;
        Ok(Changed { changed })
    })
    .await
}

/// Route leaderboard updates to a channel (null stops them).
#[put("/api/scopes/{scope}/leaderboard-channel")]
async fn api_leaderboard_channel(
    state: AppState,
    path: Path<ScopePath>,
    body: Json<ChannelBody>,
) -> HttpResponse {
    let scope = path.into_inner().scope;
    run(&state, move |ctx| {
        ctx.service
            .set_leaderboard_channel(&body.actor, &scope, body.channel.as_deref())?;
        Ok(Changed { changed: true })
    })
    .await
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    let store = JsonFileStore::open(JsonFile::new(&config.data_file, config.backup))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    let store = Arc::new(store);
    let notifier = Arc::new(TextNotifier::new());
    let service = TournamentService::new(
        store.clone(),
        Arc::new(RoleAuthorizer::new(store)),
        notifier.clone(),
    );

    let bind = (config.host.clone(), config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let state = Data::new(AppContext {
        service,
        notifier,
        config,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_get_tournament)
            .service(api_last_result)
            .service(api_configure)
            .service(api_open_registration)
            .service(api_register)
            .service(api_unregister)
            .service(api_add_filler)
            .service(api_start)
            .service(api_record_winner)
            .service(api_cancel)
            .service(api_leaderboard)
            .service(api_trophy_leaderboard)
            .service(api_leaderboard_csv)
            .service(api_rendered)
            .service(api_points)
            .service(api_trophies)
            .service(api_add_tag)
            .service(api_remove_tag)
            .service(api_reset_stats)
            .service(api_permissions)
            .service(api_grant)
            .service(api_revoke)
            .service(api_leaderboard_channel)
    })
    .bind(bind)?
    .run()
    .await
}
