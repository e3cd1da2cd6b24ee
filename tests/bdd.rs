use std::{collections::HashMap, fmt, net::SocketAddr};

use anyhow::Context;
use axum::{
    body::Body,
    extract::Query,
    http::{header, Method, Request, StatusCode},
    routing::get,
    Json, Router,
};
use cucumber::{given, then, when, World as _};
use http_body_util::BodyExt;
use journeystack::{
    auth::{self, AuthenticatedUser},
    config::{parse_base_url, AppConfig},
    db::init_pool,
    error::AppError,
    routes::create_router,
    services::{google::GoogleVerifier, storage::StorageService},
    state::AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::{net::TcpListener, task::JoinSet};
use tower::ServiceExt;

const MAX_UPLOAD_BYTES: usize = 64 * 1024;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    users: HashMap<String, Account>,
    trips: HashMap<String, String>,
    photos: HashMap<String, String>,
    photo_keys: HashMap<String, String>,
    last_status: Option<StatusCode>,
    last_body: Value,
}

#[derive(Debug, Clone)]
struct Account {
    user: AuthenticatedUser,
    token: String,
}

struct TestState {
    app: AppState,
    router: Router,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let media_root = root.path().join("uploads");
        let db_path = root.path().join("bdd.sqlite");
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            media_root: media_root.clone(),
            public_base_url: parse_base_url("http://journeys.test")?,
            jwt_secret: "bdd-jwt-secret".into(),
            jwt_ttl_hours: 1,
            timezone: chrono_tz::Tz::UTC,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            google_client_id: None,
        };

        let db = init_pool(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&db).await?;

        let storage = StorageService::new(media_root, config.public_base_url.clone());
        storage.ensure_structure().await?;

        let app = AppState::new(config, db, storage, None);
        let router = create_router(app.clone());
        Ok(Self {
            app,
            router,
            _root: root,
        })
    }
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        &self
            .state
            .as_ref()
            .expect("state must be initialised first")
            .app
    }

    fn account(&self, name: &str) -> Account {
        self.users
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("unknown user {name}"))
    }

    fn trip_id(&self, title: &str) -> String {
        self.trips
            .get(title)
            .cloned()
            .unwrap_or_else(|| panic!("unknown trip {title}"))
    }

    fn router(&self) -> Router {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .router
            .clone()
    }

    async fn send(&mut self, as_user: Option<&str>, request: Request<Body>) -> (StatusCode, Value) {
        let token = as_user.map(|name| self.account(name).token);
        let (status, body) = dispatch(self.router(), token.as_deref(), request).await;
        self.last_status = Some(status);
        self.last_body = body.clone();
        (status, body)
    }

    async fn call(
        &mut self,
        as_user: Option<&str>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(as_user, request).await
    }

    async fn packing_items(&mut self, user: &str, trip: &str) -> Vec<Value> {
        let id = self.trip_id(trip);
        let (status, body) = self
            .call(
                Some(user),
                Method::GET,
                &format!("/api/v1/trips/{id}/packinglist"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["items"].as_array().cloned().unwrap_or_default()
    }

    async fn packing_item_id(&mut self, user: &str, trip: &str, name: &str) -> String {
        self.packing_items(user, trip)
            .await
            .into_iter()
            .find(|item| item["name"] == name)
            .and_then(|item| item["id"].as_str().map(str::to_string))
            .unwrap_or_else(|| panic!("no packing item {name}"))
    }
}

async fn dispatch(
    router: Router,
    token: Option<&str>,
    mut request: Request<Body>,
) -> (StatusCode, Value) {
    if let Some(token) = token {
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().expect("header value"),
        );
    }
    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

// ----- accounts -----

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.users.clear();
    world.trips.clear();
    world.photos.clear();
    world.photo_keys.clear();
    world.last_status = None;
}

#[given(
    regex = r#"^a registered user "([^"]+)" with email "([^"]+)" and password "([^"]+)"$"#
)]
async fn given_registered_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    register_user(world, username, email, password).await;
}

#[when(
    regex = r#"^I register a user "([^"]+)" with email "([^"]+)" and password "([^"]+)"$"#
)]
async fn when_register_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    register_user(world, username, email, password).await;
}

async fn register_user(world: &mut AppWorld, username: String, email: String, password: String) {
    let user = auth::register_user(world.app_state(), &username, &email, &password)
        .await
        .expect("register user");
    let token = world.app_state().tokens.issue(&user).expect("token");
    world.users.insert(username, Account { user, token });
}

#[then(regex = r#"^I can authenticate as "([^"]+)" using password "([^"]+)"$"#)]
async fn then_can_authenticate(world: &mut AppWorld, identifier: String, password: String) {
    let authed = auth::authenticate_user(world.app_state(), &identifier, &password)
        .await
        .expect("authentication");
    let expected = world
        .users
        .values()
        .find(|account| account.user.id == authed.id)
        .expect("a registered account");
    assert_eq!(authed.username, expected.user.username);
}

#[then(regex = r#"^authenticating as "([^"]+)" using password "([^"]+)" fails$"#)]
async fn then_cannot_authenticate(world: &mut AppWorld, identifier: String, password: String) {
    let result = auth::authenticate_user(world.app_state(), &identifier, &password).await;
    assert!(matches!(result, Err(AppError::Unauthorized)), "{result:?}");
}

#[then(
    regex = r#"^registering "([^"]+)" with email "([^"]+)" and password "([^"]+)" is a conflict$"#
)]
async fn then_register_conflict(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    let result = auth::register_user(world.app_state(), &username, &email, &password).await;
    assert!(matches!(result, Err(AppError::Conflict(_))), "{result:?}");
}

#[when(regex = r#"^"([^"]+)" signs up over HTTP with email "([^"]+)" and password "([^"]+)"$"#)]
async fn when_http_register(world: &mut AppWorld, username: String, email: String, password: String) {
    let body = json!({ "username": username, "email": email, "password": password });
    let (status, body) = world
        .call(None, Method::POST, "/api/v1/auth/register", Some(body))
        .await;
    if status == StatusCode::CREATED {
        let token = body["token"].as_str().expect("token").to_string();
        let user = world.app_state().tokens.verify(&token).expect("valid token");
        world.users.insert(username, Account { user, token });
    }
}

#[when(regex = r#"^"([^"]+)" asks who they are$"#)]
async fn when_me(world: &mut AppWorld, user: String) {
    world
        .call(Some(&user), Method::GET, "/api/v1/auth/me", None)
        .await;
}

#[when("an anonymous client lists trips")]
async fn when_anonymous_lists(world: &mut AppWorld) {
    world.call(None, Method::GET, "/api/v1/trips", None).await;
}

#[when("a client with a forged token lists trips")]
async fn when_forged_token(world: &mut AppWorld) {
    let request = Request::builder()
        .uri("/api/v1/trips")
        .header(header::AUTHORIZATION, "Bearer not.a.token")
        .body(Body::empty())
        .expect("request");
    world.send(None, request).await;
}

#[when("google sign-in is attempted")]
async fn when_google(world: &mut AppWorld) {
    world
        .call(
            None,
            Method::POST,
            "/api/v1/auth/google",
            Some(json!({ "credential": "whatever" })),
        )
        .await;
}

// ----- trips -----

#[given(regex = r#"^"([^"]+)" has a trip "([^"]+)" from "([^"]+)" to "([^"]+)"$"#)]
async fn given_trip(world: &mut AppWorld, user: String, title: String, start: String, end: String) {
    create_trip(world, user, title, start, end).await;
    assert_eq!(world.last_status, Some(StatusCode::CREATED), "{}", world.last_body);
}

#[when(regex = r#"^"([^"]+)" creates a trip "([^"]+)" from "([^"]+)" to "([^"]+)"$"#)]
async fn when_create_trip(world: &mut AppWorld, user: String, title: String, start: String, end: String) {
    create_trip(world, user, title, start, end).await;
}

async fn create_trip(world: &mut AppWorld, user: String, title: String, start: String, end: String) {
    let body = json!({
        "title": title,
        "start_date": start,
        "end_date": end,
        "destinations": [title.clone()],
    });
    let (status, body) = world
        .call(Some(&user), Method::POST, "/api/v1/trips", Some(body))
        .await;
    if status == StatusCode::CREATED {
        let id = body["id"].as_str().expect("trip id").to_string();
        world.trips.insert(title, id);
    }
}

#[when(regex = r#"^"([^"]+)" requests the trip "([^"]+)"$"#)]
async fn when_get_trip(world: &mut AppWorld, user: String, title: String) {
    let id = world.trip_id(&title);
    world
        .call(Some(&user), Method::GET, &format!("/api/v1/trips/{id}"), None)
        .await;
}

#[when(regex = r#"^"([^"]+)" renames the trip "([^"]+)" to "([^"]+)"$"#)]
async fn when_rename_trip(world: &mut AppWorld, user: String, title: String, new_title: String) {
    let id = world.trip_id(&title);
    world
        .call(
            Some(&user),
            Method::PUT,
            &format!("/api/v1/trips/{id}"),
            Some(json!({ "title": new_title })),
        )
        .await;
}

#[when(regex = r#"^"([^"]+)" deletes the trip "([^"]+)"$"#)]
async fn when_delete_trip(world: &mut AppWorld, user: String, title: String) {
    let id = world.trip_id(&title);
    world
        .call(Some(&user), Method::DELETE, &format!("/api/v1/trips/{id}"), None)
        .await;
}

#[then(regex = r#"^"([^"]+)" has (\d+) trips?$"#)]
async fn then_trip_count(world: &mut AppWorld, user: String, expected: usize) {
    let (status, body) = world
        .call(Some(&user), Method::GET, "/api/v1/trips", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(expected));
}

#[then(regex = r"^the response status is (\d+)$")]
async fn then_status(world: &mut AppWorld, expected: u16) {
    assert_eq!(
        world.last_status.map(|s| s.as_u16()),
        Some(expected),
        "body: {}",
        world.last_body
    );
}

#[then(regex = r#"^the response field "([^"]+)" is "([^"]*)"$"#)]
async fn then_field(world: &mut AppWorld, path: String, expected: String) {
    let pointer = format!("/{}", path.replace('.', "/"));
    let value = world
        .last_body
        .pointer(&pointer)
        .unwrap_or_else(|| panic!("no field {path} in {}", world.last_body));
    match value {
        Value::String(s) => assert_eq!(s, &expected),
        other => assert_eq!(other.to_string(), expected),
    }
}

#[then(regex = r#"^the response field "([^"]+)" is not empty$"#)]
async fn then_field_present(world: &mut AppWorld, path: String) {
    let pointer = format!("/{}", path.replace('.', "/"));
    let value = world.last_body.pointer(&pointer).cloned().unwrap_or(Value::Null);
    assert!(
        value.as_str().map(|s| !s.is_empty()).unwrap_or(false),
        "field {path} is empty in {}",
        world.last_body
    );
}

#[when(regex = r#"^"([^"]+)" sends a truncated trip body$"#)]
async fn when_truncated_trip(world: &mut AppWorld, user: String) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/trips")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"title":"#))
        .expect("request");
    world.send(Some(&user), request).await;
}

#[when(regex = r#"^"([^"]+)" sends a trip starting on "([^"]+)"$"#)]
async fn when_trip_with_start(world: &mut AppWorld, user: String, start: String) {
    let body = json!({ "title": "Odd", "start_date": start, "end_date": "2024-05-05" });
    world
        .call(Some(&user), Method::POST, "/api/v1/trips", Some(body))
        .await;
}

// ----- journal -----

#[when(regex = r#"^"([^"]+)" writes a journal entry "([^"]+)" on "([^"]+)" dated "([^"]+)"$"#)]
async fn when_write_entry(world: &mut AppWorld, user: String, title: String, trip: String, date: String) {
    let id = world.trip_id(&trip);
    world
        .call(
            Some(&user),
            Method::POST,
            &format!("/api/v1/trips/{id}/journal"),
            Some(json!({ "title": title, "content": "It was lovely.", "entry_date": date })),
        )
        .await;
}

#[then(regex = r#"^the journal of "([^"]+)" for "([^"]+)" lists "([^"]*)"$"#)]
async fn then_journal_lists(world: &mut AppWorld, trip: String, user: String, expected: String) {
    let id = world.trip_id(&trip);
    let (status, body) = world
        .call(Some(&user), Method::GET, &format!("/api/v1/trips/{id}/journal"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<String> = body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|entry| entry["title"].as_str().map(str::to_string))
        .collect();
    assert_eq!(titles, split_list(&expected));
}

async fn latest_entry_id(world: &mut AppWorld, trip: &str, owner: &str) -> String {
    let id = world.trip_id(trip);
    let (_, body) = world
        .call(Some(owner), Method::GET, &format!("/api/v1/trips/{id}/journal"), None)
        .await;
    body[0]["id"].as_str().expect("an entry").to_string()
}

#[when(regex = r#"^"([^"]+)" deletes the latest journal entry of "([^"]+)" owned by "([^"]+)"$"#)]
async fn when_delete_entry(world: &mut AppWorld, user: String, trip: String, owner: String) {
    let entry_id = latest_entry_id(world, &trip, &owner).await;
    world
        .call(Some(&user), Method::DELETE, &format!("/api/v1/journal/{entry_id}"), None)
        .await;
}

#[when(regex = r#"^"([^"]+)" reads the latest journal entry of "([^"]+)" owned by "([^"]+)"$"#)]
async fn when_read_entry(world: &mut AppWorld, user: String, trip: String, owner: String) {
    let entry_id = latest_entry_id(world, &trip, &owner).await;
    world
        .call(Some(&user), Method::GET, &format!("/api/v1/journal/{entry_id}"), None)
        .await;
}

#[when(
    regex = r#"^"([^"]+)" retitles the latest journal entry of "([^"]+)" owned by "([^"]+)" to "([^"]+)"$"#
)]
async fn when_retitle_entry(
    world: &mut AppWorld,
    user: String,
    trip: String,
    owner: String,
    title: String,
) {
    let entry_id = latest_entry_id(world, &trip, &owner).await;
    world
        .call(
            Some(&user),
            Method::PUT,
            &format!("/api/v1/journal/{entry_id}"),
            Some(json!({ "title": title })),
        )
        .await;
}

// ----- packing list -----

#[given(regex = r#"^"([^"]+)" packs "([^"]+)" for "([^"]+)"$"#)]
async fn given_packing_items(world: &mut AppWorld, user: String, items: String, trip: String) {
    let id = world.trip_id(&trip);
    for name in split_list(&items) {
        let (status, _) = world
            .call(
                Some(&user),
                Method::POST,
                &format!("/api/v1/trips/{id}/packinglist/items"),
                Some(json!({ "name": name, "category": "clothes" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[when(regex = r#"^"([^"]+)" toggles "([^"]+)" on "([^"]+)"$"#)]
async fn when_toggle(world: &mut AppWorld, user: String, item: String, trip: String) {
    toggle(world, user.clone(), item, trip, user).await;
}

#[when(regex = r#"^"([^"]+)" toggles "([^"]+)" on "([^"]+)" owned by "([^"]+)"$"#)]
async fn when_toggle_foreign(
    world: &mut AppWorld,
    user: String,
    item: String,
    trip: String,
    owner: String,
) {
    toggle(world, user, item, trip, owner).await;
}

async fn toggle(world: &mut AppWorld, user: String, item: String, trip: String, owner: String) {
    let item_id = world.packing_item_id(&owner, &trip, &item).await;
    let id = world.trip_id(&trip);
    world
        .call(
            Some(&user),
            Method::POST,
            &format!("/api/v1/trips/{id}/packinglist/items/{item_id}/toggle"),
            None,
        )
        .await;
}

#[when(regex = r#"^"([^"]+)" removes "([^"]+)" from "([^"]+)"$"#)]
async fn when_remove_item(world: &mut AppWorld, user: String, item: String, trip: String) {
    let item_id = world.packing_item_id(&user, &trip, &item).await;
    let id = world.trip_id(&trip);
    world
        .call(
            Some(&user),
            Method::DELETE,
            &format!("/api/v1/trips/{id}/packinglist/items/{item_id}"),
            None,
        )
        .await;
}

#[then(regex = r#"^the packing list of "([^"]+)" for "([^"]+)" is "([^"]*)"$"#)]
async fn then_packing_list(world: &mut AppWorld, trip: String, user: String, expected: String) {
    let names: Vec<String> = world
        .packing_items(&user, &trip)
        .await
        .iter()
        .filter_map(|item| item["name"].as_str().map(str::to_string))
        .collect();
    assert_eq!(names, split_list(&expected));
}

#[then(regex = r#"^on "([^"]+)" for "([^"]+)" only "([^"]*)" (?:is|are) packed$"#)]
async fn then_only_packed(world: &mut AppWorld, trip: String, user: String, expected: String) {
    let packed: Vec<String> = world
        .packing_items(&user, &trip)
        .await
        .iter()
        .filter(|item| item["packed"] == true)
        .filter_map(|item| item["name"].as_str().map(str::to_string))
        .collect();
    assert_eq!(packed, split_list(&expected));
}

// ----- itinerary -----

#[when(regex = r#"^"([^"]+)" schedules "([^"]+)" at "([^"]+)" on "([^"]+)"$"#)]
async fn when_schedule(world: &mut AppWorld, user: String, title: String, at: String, trip: String) {
    let id = world.trip_id(&trip);
    world
        .call(
            Some(&user),
            Method::POST,
            &format!("/api/v1/trips/{id}/activities"),
            Some(json!({ "title": title, "type": "sightseeing", "starts_at": at })),
        )
        .await;
}

#[then(regex = r#"^the itinerary of "([^"]+)" for "([^"]+)" in "([^"]+)" has "([^"]+)" on "([^"]+)"$"#)]
async fn then_itinerary_day(
    world: &mut AppWorld,
    trip: String,
    user: String,
    tz: String,
    title: String,
    date: String,
) {
    let id = world.trip_id(&trip);
    let (status, body) = world
        .call(
            Some(&user),
            Method::GET,
            &format!("/api/v1/trips/{id}/itinerary?tz={tz}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let day = body["days"]
        .as_array()
        .expect("days")
        .iter()
        .find(|day| day["date"] == date.as_str())
        .unwrap_or_else(|| panic!("no day {date} in {body}"));
    let titles: Vec<&str> = day["activities"]
        .as_array()
        .expect("activities")
        .iter()
        .filter_map(|a| a["title"].as_str())
        .collect();
    assert!(titles.contains(&title.as_str()), "{titles:?}");
}

#[when(regex = r#"^"([^"]+)" requests the itinerary of "([^"]+)" in "([^"]+)"$"#)]
async fn when_itinerary(world: &mut AppWorld, user: String, trip: String, tz: String) {
    let id = world.trip_id(&trip);
    world
        .call(
            Some(&user),
            Method::GET,
            &format!("/api/v1/trips/{id}/itinerary?tz={tz}"),
            None,
        )
        .await;
}

#[then(regex = r#"^the itinerary of "([^"]+)" for "([^"]+)" has (\d+) days$"#)]
async fn then_itinerary_len(world: &mut AppWorld, trip: String, user: String, days: usize) {
    let id = world.trip_id(&trip);
    let (_, body) = world
        .call(Some(&user), Method::GET, &format!("/api/v1/trips/{id}/itinerary"), None)
        .await;
    assert_eq!(body["days"].as_array().map(Vec::len), Some(days));
}

// ----- photos -----

fn multipart_upload(content_type: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let boundary = "journeystack-boundary";
    let mut payload = Vec::new();
    payload.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    payload.extend_from_slice(data);
    payload.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/media/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(payload))
        .expect("request")
}

#[when(regex = r#"^"([^"]+)" uploads a photo "([^"]+)" to "([^"]+)"$"#)]
async fn when_upload_photo(world: &mut AppWorld, user: String, label: String, trip: String) {
    upload_photo(world, user, label, "image/png".into(), trip).await;
}

#[when(regex = r#"^"([^"]+)" uploads a photo "([^"]+)" of type "([^"]+)" to "([^"]+)"$"#)]
async fn when_upload_typed_photo(
    world: &mut AppWorld,
    user: String,
    label: String,
    content_type: String,
    trip: String,
) {
    upload_photo(world, user, label, content_type, trip).await;
}

async fn upload_photo(
    world: &mut AppWorld,
    user: String,
    label: String,
    content_type: String,
    trip: String,
) {
    let data = format!("fake-image-bytes-{label}");
    let request = multipart_upload(&content_type, &format!("{label}.img"), data.as_bytes());
    let (status, body) = world.send(Some(&user), request).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["content_type"], content_type.as_str());
    let key = body["storage_key"].as_str().expect("storage key").to_string();

    let trip_id = world.trip_id(&trip);
    let (status, body) = world
        .call(
            Some(&user),
            Method::POST,
            "/api/v1/media/confirm",
            Some(json!({ "trip_id": trip_id, "storage_key": key, "set_as_cover": true })),
        )
        .await;
    if status == StatusCode::CREATED {
        let id = body["id"].as_str().expect("media id").to_string();
        world.photos.insert(label.clone(), id);
        world.photo_keys.insert(label, key);
    }
}

#[when(regex = r#"^"([^"]+)" uploads a photo larger than the upload limit$"#)]
async fn when_upload_oversized(world: &mut AppWorld, user: String) {
    let data = vec![0u8; MAX_UPLOAD_BYTES * 2];
    let request = multipart_upload("image/png", "huge.png", &data);
    world.send(Some(&user), request).await;
}

#[then(regex = r#"^the stored file of photo "([^"]+)" (exists|is gone)$"#)]
async fn then_photo_file(world: &mut AppWorld, label: String, state: String) {
    let key = world
        .photo_keys
        .get(&label)
        .cloned()
        .unwrap_or_else(|| panic!("unknown photo {label}"));
    let exists = world
        .app_state()
        .storage
        .exists(&key)
        .await
        .expect("storage lookup");
    assert_eq!(exists, state == "exists", "file {key}");
}

#[when(regex = r#"^"([^"]+)" deletes the photo "([^"]+)"$"#)]
async fn when_delete_photo(world: &mut AppWorld, user: String, label: String) {
    let id = world
        .photos
        .get(&label)
        .cloned()
        .unwrap_or_else(|| panic!("unknown photo {label}"));
    world
        .call(Some(&user), Method::DELETE, &format!("/api/v1/media/{id}"), None)
        .await;
}

#[then(regex = r#"^"([^"]+)" sees (\d+) photos? on "([^"]+)"$"#)]
async fn then_photo_count(world: &mut AppWorld, user: String, expected: usize, trip: String) {
    let id = world.trip_id(&trip);
    let (status, body) = world
        .call(Some(&user), Method::GET, &format!("/api/v1/trips/{id}/photos"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(expected));
}

// ----- stats -----

#[then(regex = r#"^the stats of "([^"]+)" report (\d+) trips?, (\d+) entr(?:y|ies) and (\d+) photos?$"#)]
async fn then_stats(world: &mut AppWorld, user: String, trips: u64, entries: u64, photos: u64) {
    let (status, body) = world
        .call(Some(&user), Method::GET, "/api/v1/stats", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trips"], trips);
    assert_eq!(body["journal_entries"], entries);
    assert_eq!(body["photos"], photos);
}

// ----- google sign-in -----

/// Serves a stand-in for Google's tokeninfo endpoint. Credentials are
/// `<email>|<subject>` and always verify for `client_id`.
async fn start_tokeninfo_stub(client_id: String) -> SocketAddr {
    let stub = Router::new().route(
        "/tokeninfo",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let client_id = client_id.clone();
            async move {
                let credential = params.get("id_token").cloned().unwrap_or_default();
                let (email, subject) = credential.split_once('|').unwrap_or_default();
                Json(json!({
                    "aud": client_id,
                    "sub": subject,
                    "email": email,
                    "email_verified": "true",
                }))
            }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind tokeninfo stub");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move { axum::serve(listener, stub).await });
    addr
}

#[given(regex = r#"^Google sign-in is configured for client "([^"]+)"$"#)]
async fn given_google(world: &mut AppWorld, client_id: String) {
    let addr = start_tokeninfo_stub(client_id.clone()).await;
    let state = world.state.as_mut().expect("state must be initialised first");
    state.app.google = Some(GoogleVerifier::with_endpoint(
        client_id,
        format!("http://{addr}/tokeninfo"),
    ));
    state.router = create_router(state.app.clone());
}

#[when(regex = r#"^Google vouches for "([^"]+)" with subject "([^"]+)"$"#)]
async fn when_google_vouches(world: &mut AppWorld, email: String, subject: String) {
    let (status, body) = world
        .call(
            None,
            Method::POST,
            "/api/v1/auth/google",
            Some(json!({ "credential": format!("{email}|{subject}") })),
        )
        .await;
    if status == StatusCode::OK {
        let token = body["token"].as_str().expect("token").to_string();
        let user = world.app_state().tokens.verify(&token).expect("valid token");
        world.users.insert(user.username.clone(), Account { user, token });
    }
}

// ----- more packing -----

#[when(regex = r#"^"([^"]+)" moves "([^"]+)" to position (\d+) on "([^"]+)"$"#)]
async fn when_move_item(world: &mut AppWorld, user: String, item: String, position: usize, trip: String) {
    let item_id = world.packing_item_id(&user, &trip, &item).await;
    let id = world.trip_id(&trip);
    world
        .call(
            Some(&user),
            Method::POST,
            &format!("/api/v1/trips/{id}/packinglist/items/{item_id}/move"),
            Some(json!({ "position": position })),
        )
        .await;
}

#[when(regex = r#"^"([^"]+)" clears packed items from "([^"]+)"$"#)]
async fn when_clear_packed(world: &mut AppWorld, user: String, trip: String) {
    let id = world.trip_id(&trip);
    world
        .call(
            Some(&user),
            Method::DELETE,
            &format!("/api/v1/trips/{id}/packinglist/packed"),
            None,
        )
        .await;
}

#[when(regex = r#"^"([^"]+)" replaces the packing list of "([^"]+)" with "([^"]*)"$"#)]
async fn when_replace_list(world: &mut AppWorld, user: String, trip: String, items: String) {
    let id = world.trip_id(&trip);
    let items: Vec<Value> = split_list(&items)
        .into_iter()
        .map(|name| json!({ "name": name }))
        .collect();
    world
        .call(
            Some(&user),
            Method::PUT,
            &format!("/api/v1/trips/{id}/packinglist"),
            Some(json!({ "items": items })),
        )
        .await;
}

#[when(regex = r#"^"([^"]+)" sends a packing list without items for "([^"]+)"$"#)]
async fn when_replace_without_items(world: &mut AppWorld, user: String, trip: String) {
    let id = world.trip_id(&trip);
    world
        .call(
            Some(&user),
            Method::PUT,
            &format!("/api/v1/trips/{id}/packinglist"),
            Some(json!({ "things": ["socks"] })),
        )
        .await;
}

#[when(regex = r#"^"([^"]+)" toggles "([^"]+)" and "([^"]+)" (\d+) times each at once on "([^"]+)"$"#)]
async fn when_concurrent_toggles(
    world: &mut AppWorld,
    user: String,
    first: String,
    second: String,
    times: usize,
    trip: String,
) {
    let first_id = world.packing_item_id(&user, &trip, &first).await;
    let second_id = world.packing_item_id(&user, &trip, &second).await;
    let trip_id = world.trip_id(&trip);
    let token = world.account(&user).token;

    let mut requests = JoinSet::new();
    for round in 0..times * 2 {
        let item_id = if round % 2 == 0 { &first_id } else { &second_id };
        let uri = format!("/api/v1/trips/{trip_id}/packinglist/items/{item_id}/toggle");
        let router = world.router();
        let token = token.clone();
        requests.spawn(async move {
            let request = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .body(Body::empty())
                .expect("request");
            dispatch(router, Some(&token), request).await
        });
    }
    while let Some(joined) = requests.join_next().await {
        let (status, body) = joined.expect("toggle task");
        assert_eq!(status, StatusCode::OK, "{body}");
    }
}

// ----- activities -----

async fn activity_id(world: &mut AppWorld, owner: &str, trip: &str, title: &str) -> String {
    let id = world.trip_id(trip);
    let (status, body) = world
        .call(Some(owner), Method::GET, &format!("/api/v1/trips/{id}/activities"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    body.as_array()
        .expect("activities")
        .iter()
        .find(|activity| activity["title"] == title)
        .and_then(|activity| activity["id"].as_str().map(str::to_string))
        .unwrap_or_else(|| panic!("no activity {title}"))
}

#[when(regex = r#"^"([^"]+)" reschedules "([^"]+)" on "([^"]+)" owned by "([^"]+)" to "([^"]+)"$"#)]
async fn when_reschedule(
    world: &mut AppWorld,
    user: String,
    title: String,
    trip: String,
    owner: String,
    at: String,
) {
    let activity = activity_id(world, &owner, &trip, &title).await;
    world
        .call(
            Some(&user),
            Method::PUT,
            &format!("/api/v1/activities/{activity}"),
            Some(json!({ "starts_at": at })),
        )
        .await;
}

#[when(regex = r#"^"([^"]+)" cancels "([^"]+)" on "([^"]+)" owned by "([^"]+)"$"#)]
async fn when_cancel_activity(world: &mut AppWorld, user: String, title: String, trip: String, owner: String) {
    let activity = activity_id(world, &owner, &trip, &title).await;
    world
        .call(
            Some(&user),
            Method::DELETE,
            &format!("/api/v1/activities/{activity}"),
            None,
        )
        .await;
}

#[then(regex = r#"^the itinerary of "([^"]+)" for "([^"]+)" has no activities$"#)]
async fn then_itinerary_empty(world: &mut AppWorld, trip: String, user: String) {
    let id = world.trip_id(&trip);
    let (status, body) = world
        .call(Some(&user), Method::GET, &format!("/api/v1/trips/{id}/itinerary"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let scheduled: usize = body["days"]
        .as_array()
        .expect("days")
        .iter()
        .map(|day| day["activities"].as_array().map_or(0, Vec::len))
        .sum();
    assert_eq!(scheduled, 0, "{body}");
    assert_eq!(body["unscheduled"].as_array().map(Vec::len), Some(0));
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
