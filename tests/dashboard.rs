mod common;

use common::*;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use take_it::auth::{Auth, SessionContext};
use take_it::cache::QueryCache;
use take_it::config::ClientOptions;
use take_it::dashboard::{ActivePanel, Dashboard};
use take_it::error::Error;
use take_it::form::FormMode;
use take_it::models::{Category, Profile, RequestStatus, Role};
use take_it::views::{FlashKind, ViewState};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TTL: Duration = Duration::from_secs(3);

async fn mount(gateway: &Arc<MemoryGateway>, user_id: &str, role: Role) -> Dashboard {
    let cache = Arc::new(cache_over(gateway));
    let session = SessionContext::fixed(Some(session_for(user_id, "Dana Levi", role)));
    Dashboard::mount(cache, session, TTL).await.unwrap()
}

#[tokio::test]
async fn test_mount_requires_a_session() {
    let gateway = MemoryGateway::new();
    let cache = Arc::new(QueryCache::new(gateway.clone()));

    let result = Dashboard::mount(cache, SessionContext::fixed(None), TTL).await;
    assert!(matches!(result, Err(Error::Auth(_))));
}

#[tokio::test]
async fn test_mount_creates_missing_profile_from_signup_metadata() {
    let gateway = MemoryGateway::new();
    let dashboard = mount(&gateway, "u1", Role::Provider).await;

    let profile = dashboard.profile().unwrap();
    assert_eq!(profile.full_name.as_deref(), Some("Dana Levi"));
    assert_eq!(profile.role, Role::Provider);
    assert_eq!(gateway.profile(&user("u1")).as_ref(), Some(profile));

    assert_eq!(dashboard.panel(), ActivePanel::CallsInMyArea);
    assert_eq!(dashboard.open_calls().state(), &ViewState::Empty);
}

#[tokio::test]
async fn test_initial_panel_does_not_depend_on_role() {
    let gateway = MemoryGateway::new();
    let dashboard = mount(&gateway, "u1", Role::Client).await;
    assert_eq!(dashboard.panel(), ActivePanel::CallsInMyArea);
}

#[tokio::test]
async fn test_profile_city_filters_open_calls() {
    let gateway = MemoryGateway::new();
    let mut profile = Profile::new(user("u2"));
    profile.city = Some("תל אביב".to_string());
    gateway.seed_profile(profile);
    let near = request("u1", RequestStatus::Open, "תל אביב - מרכז", 1);
    gateway.seed(near.clone());
    gateway.seed(request("u1", RequestStatus::Open, "חיפה", 2));

    let dashboard = mount(&gateway, "u2", Role::Provider).await;
    let ids: Vec<_> = dashboard.open_calls().requests().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![near.id]);
    assert_eq!(gateway.writes(), 0, "an existing profile is not rewritten");
}

#[tokio::test]
async fn test_profile_load_failure_is_not_fatal() {
    let gateway = MemoryGateway::new();
    gateway.fail(Op::FetchProfile);

    let dashboard = mount(&gateway, "u1", Role::Client).await;
    assert!(dashboard.profile().is_none());
    assert_eq!(dashboard.flash().unwrap().kind, FlashKind::Error);
}

#[tokio::test]
async fn test_edit_cancel_and_submit_transitions() {
    let gateway = MemoryGateway::new();
    let mut mine = request("u1", RequestStatus::Open, "חיפה", 1);
    mine.image_url = Some("u1/1.jpg".to_string());
    gateway.seed(mine.clone());
    let mut dashboard = mount(&gateway, "u1", Role::Client).await;

    dashboard.navigate(ActivePanel::MyOpenedCalls).await;
    assert_eq!(dashboard.my_requests().requests().len(), 1);

    assert!(dashboard.edit_request(mine.id));
    assert_eq!(dashboard.panel(), ActivePanel::NewRequestForm);
    assert_eq!(dashboard.form().mode(), &FormMode::Edit(mine.clone()));

    dashboard.cancel_form().await;
    assert_eq!(dashboard.panel(), ActivePanel::MyOpenedCalls);
    assert!(!dashboard.form().is_editing());

    assert!(dashboard.edit_request(mine.id));
    dashboard.form_mut().category = Some(Category::Painting);
    let updated = dashboard.submit_form().await.unwrap();

    assert_eq!(updated.category, Category::Painting);
    assert_eq!(updated.image_url, mine.image_url);
    assert_eq!(dashboard.panel(), ActivePanel::MyOpenedCalls);
    assert_eq!(dashboard.flash().unwrap().message, "Request updated successfully!");
    assert_eq!(
        dashboard.my_requests().requests()[0].category,
        Category::Painting,
        "list shows the stored row after submit"
    );
}

#[tokio::test]
async fn test_sidebar_form_starts_a_new_request() {
    let gateway = MemoryGateway::new();
    let mine = request("u1", RequestStatus::Open, "חיפה", 1);
    gateway.seed(mine.clone());
    let mut dashboard = mount(&gateway, "u1", Role::Client).await;

    dashboard.navigate(ActivePanel::MyOpenedCalls).await;
    dashboard.edit_request(mine.id);
    dashboard.navigate(ActivePanel::NewRequestForm).await;
    assert!(!dashboard.form().is_editing());

    let form = dashboard.form_mut();
    form.title = "Fix the boiler".to_string();
    form.category = Some(Category::Electricity);
    form.description = "No hot water".to_string();
    form.price = "300".to_string();
    form.city = "חיפה".to_string();
    let created = dashboard.submit_form().await.unwrap();

    assert_eq!(dashboard.panel(), ActivePanel::MyOpenedCalls);
    assert_eq!(dashboard.flash().unwrap().message, "Request created successfully!");
    assert_eq!(dashboard.my_requests().requests()[0].id, created.id);
}

#[tokio::test]
async fn test_invalid_submit_stays_on_form() {
    let gateway = MemoryGateway::new();
    let mut dashboard = mount(&gateway, "u1", Role::Client).await;
    let writes = gateway.writes();

    dashboard.navigate(ActivePanel::NewRequestForm).await;
    dashboard.form_mut().title = "Only a title".to_string();
    let result = dashboard.submit_form().await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(dashboard.panel(), ActivePanel::NewRequestForm);
    assert_eq!(dashboard.flash().unwrap().message, "category is required");
    assert_eq!(gateway.writes(), writes);
}

#[tokio::test]
async fn test_profile_edits_are_written_only_on_save() {
    let gateway = MemoryGateway::new();
    let mut dashboard = mount(&gateway, "u1", Role::Client).await;
    let writes = gateway.writes();

    dashboard.open_profile();
    assert!(dashboard.is_profile_open());
    dashboard.profile_draft_mut().phone = Some("050-0000000".to_string());
    dashboard.close_profile();
    assert_eq!(dashboard.profile_draft().phone, None, "closing discards the draft");
    assert_eq!(gateway.writes(), writes);

    dashboard.open_profile();
    dashboard.profile_draft_mut().phone = Some("050-1234567".to_string());
    dashboard.profile_draft_mut().city = Some("חיפה".to_string());
    let saved = dashboard.save_profile().await.unwrap();

    assert_eq!(saved.phone.as_deref(), Some("050-1234567"));
    assert_eq!(gateway.profile(&user("u1")), Some(saved.clone()));
    assert_eq!(dashboard.profile(), Some(&saved));
    assert!(!dashboard.is_profile_open());
    assert_eq!(dashboard.open_calls().city().map(|c| c.as_str()), Some("חיפה"));
}

#[tokio::test]
async fn test_failed_profile_save_keeps_draft() {
    let gateway = MemoryGateway::new();
    let mut dashboard = mount(&gateway, "u1", Role::Client).await;
    gateway.fail(Op::UpsertProfile);

    dashboard.open_profile();
    dashboard.profile_draft_mut().gender = Some("female".to_string());
    assert!(dashboard.save_profile().await.is_err());

    assert!(dashboard.is_profile_open());
    assert_eq!(dashboard.profile_draft().gender.as_deref(), Some("female"));
    assert_eq!(dashboard.profile().unwrap().gender, None);
    assert_eq!(dashboard.flash().unwrap().kind, FlashKind::Error);
}

#[tokio::test]
async fn test_claim_and_close_through_the_shell() {
    let gateway = MemoryGateway::new();
    let call = request("u1", RequestStatus::Open, "חיפה", 1);
    gateway.seed(call.clone());

    let mut provider = mount(&gateway, "u2", Role::Provider).await;
    assert_eq!(provider.open_calls().requests().len(), 1);
    provider.claim_request(call.id).await.unwrap();

    provider.navigate(ActivePanel::CallsIHandled).await;
    assert_eq!(provider.handled().requests()[0].id, call.id);

    let closed = provider.close_request(call.id).await.unwrap();
    assert_eq!(closed.status, RequestStatus::Closed);
    assert_eq!(provider.handled().requests()[0].status, RequestStatus::Closed);
}

#[tokio::test]
async fn test_sign_out_ends_the_dashboard() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let auth = Auth::new(
        &mock_server.uri(),
        "anon-key",
        Client::new(),
        ClientOptions::default(),
    );
    auth.set_session(session_for("u1", "Dana Levi", Role::Client));

    let gateway = MemoryGateway::new();
    gateway.seed(request("u1", RequestStatus::Open, "חיפה", 1));
    let cache = Arc::new(cache_over(&gateway));
    let mut dashboard = Dashboard::mount(cache.clone(), auth.subscribe(), TTL)
        .await
        .unwrap();
    dashboard.navigate(ActivePanel::MyOpenedCalls).await;
    let query = dashboard.my_requests().query();
    assert!(cache.cached(&query).is_some());

    auth.sign_out().await.unwrap();
    assert!(!dashboard.watch_session().await);
    assert!(cache.cached(&query).is_none());
}

#[tokio::test]
async fn test_token_refresh_keeps_the_dashboard() {
    let auth = Auth::new(
        "http://localhost:54321",
        "anon-key",
        Client::new(),
        ClientOptions::default(),
    );
    auth.set_session(session_for("u1", "Dana Levi", Role::Client));

    let gateway = MemoryGateway::new();
    let cache = Arc::new(cache_over(&gateway));
    let mut dashboard = Dashboard::mount(cache, auth.subscribe(), TTL).await.unwrap();

    let mut refreshed = session_for("u1", "Dana Levi", Role::Client);
    refreshed.access_token = "rotated".to_string();
    auth.set_session(refreshed);

    assert!(dashboard.watch_session().await);
    assert_eq!(dashboard.identity().user_id, user("u1"));
}
