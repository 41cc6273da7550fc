//! 视图渲染集成测试
//!
//! 通过 axum 路由完成请求提取、文档组装、输出与中间件的完整流程。

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Router,
};
use indexmap::IndexMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use xweb_core::constants::{ALERT_MESSAGES_OBJECT, ERRORS_OBJECT};
use xweb_core::xml::parse_element;
use xweb_core::{
    AlertMessage, Element, HttpSession, MemorySession, MessageResolvable, ModelMap,
    ValidationErrors, WebHelper,
};
use xweb_lib::{
    BindingContextCache, IdentityTransform, NamespaceBindingProvider, OutputParams, RedirectView,
    TransformEngine, TransformError, TransformSource, ViewConfig, ViewContext, XwebView,
};
use xweb_messages::BundleMessagesSource;
use xweb_server::{
    apply_layers, AlertMapping, AlertResolver, AlertResolverConfig, RedirectBody, ServerConfig,
    SessionHandle, StatusKind, StatusResolver, StatusResolverConfig, ViewBody, XwebRequest,
};

const APP_NS: &str = "urn:app";

struct AppState {
    view: XwebView,
    status: StatusResolver,
    redirect: RedirectView,
    alerts: AlertResolver,
}

#[derive(Debug, thiserror::Error)]
#[error("login required")]
struct LoginRequired;

impl StatusKind for LoginRequired {
    fn kind(&self) -> &'static str {
        "login"
    }
}

#[derive(Default)]
struct CountingTransform {
    calls: AtomicUsize,
}

impl TransformEngine for CountingTransform {
    fn transform(
        &self,
        source: &TransformSource<'_>,
        _params: &OutputParams,
    ) -> Result<Vec<u8>, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(source.xml.to_vec())
    }
}

async fn home(State(state): State<Arc<AppState>>, XwebRequest(request): XwebRequest) -> Response {
    let mut model = ModelMap::new();
    let name = request.parameter("name").unwrap_or("ann").to_string();
    model.insert(
        "user".to_string(),
        Element::in_namespace(APP_NS, "user")
            .with_text_child("login", name)
            .into(),
    );
    if request.parameter("welcome").is_some() {
        model.insert(
            ALERT_MESSAGES_OBJECT.to_string(),
            AlertMessage::from(MessageResolvable::new("welcome").with_arguments(["Ann"])).into(),
        );
    }
    if request.parameter("invalid").is_some() {
        let mut errors = ValidationErrors::new();
        errors.reject_value(
            "user",
            "login",
            MessageResolvable::new("error.required").with_default_message("user.login"),
        );
        model.insert(ERRORS_OBJECT.to_string(), errors.into());
    }

    match state.view.render(&request, &model, "user") {
        Ok(response) => ViewBody(response).into_response(),
        Err(e) => state.status.resolve(&e),
    }
}

async fn save(State(state): State<Arc<AppState>>, XwebRequest(request): XwebRequest) -> Response {
    let mut model = ModelMap::new();
    model.insert(
        ALERT_MESSAGES_OBJECT.to_string(),
        AlertMessage::from(MessageResolvable::new("saved")).into(),
    );
    model.insert("id".to_string(), "7".into());
    RedirectBody(state.redirect.render(&request, &model)).into_response()
}

async fn account(State(state): State<Arc<AppState>>, XwebRequest(request): XwebRequest) -> Response {
    state
        .alerts
        .resolve(&LoginRequired, &request)
        .unwrap_or_else(|| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn messages() -> Arc<BundleMessagesSource> {
    let source = BundleMessagesSource::new();
    source.add_bundle(
        "messages",
        None,
        "saved=Saved.\nwelcome=Welcome {0}.\nerror.required={0} is required.\nuser.login=Login\nerror.login=Please log in.\n",
    );
    source.add_bundle(
        "messages",
        Some(&xweb_core::Locale::language_only("fr")),
        "saved=Enregistré.\nuser.login=Identifiant\n",
    );
    Arc::new(source)
}

fn view_context(config: ViewConfig) -> ViewContext {
    let bindings = BindingContextCache::new(Arc::new(
        NamespaceBindingProvider::default().with_context("default", [APP_NS]),
    ));
    ViewContext::new(config, &bindings)
        .unwrap()
        .with_messages(messages())
}

fn server_config() -> ServerConfig {
    let mut response_headers = IndexMap::new();
    response_headers.insert("Cache-Control".to_string(), "no-cache".to_string());
    ServerConfig {
        context_path: "/app".to_string(),
        response_headers,
        ..ServerConfig::default()
    }
}

fn app_with(
    ctx: ViewContext,
    transform: Arc<dyn TransformEngine>,
    session: Option<Arc<MemorySession>>,
    status: StatusResolverConfig,
) -> Router {
    let web_helper = ctx.web_helper().clone();
    let mut alerts = AlertResolverConfig::default();
    alerts.mappings.insert(
        "login".to_string(),
        AlertMapping::new("error.login", "/home").with_save_request_url(true),
    );
    let state = Arc::new(AppState {
        view: XwebView::new("home", Arc::new(ctx), transform),
        status: StatusResolver::new(status),
        redirect: RedirectView::new("/home", web_helper.clone())
            .with_context_relative(true)
            .with_http10_compatible(false)
            .with_model_query_parameters(["id"]),
        alerts: AlertResolver::new(alerts, web_helper),
    });
    let mut router = Router::new()
        .route("/app/home", get(home))
        .route("/app/save", post(save))
        .route("/app/account", get(account))
        .with_state(state);
    if let Some(session) = session {
        let handle: Arc<dyn HttpSession> = session;
        router = router.layer(Extension(SessionHandle(handle)));
    }
    apply_layers(router, &server_config()).unwrap()
}

fn app(session: Option<Arc<MemorySession>>) -> Router {
    app_with(
        view_context(ViewConfig::default()),
        Arc::new(IdentityTransform),
        session,
        StatusResolverConfig::default(),
    )
}

async fn get_body(router: Router, uri: &str, accept_language: Option<&str>) -> (StatusCode, String) {
    let mut request = Request::builder().uri(uri).header(header::HOST, "example.com:8080");
    if let Some(language) = accept_language {
        request = request.header(header::ACCEPT_LANGUAGE, language);
    }
    let response = router
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_render_page_with_session() {
    let session = Arc::new(MemorySession::new("abc123"));
    let response = app(Some(session))
        .oneshot(
            Request::builder()
                .uri("/app/home?q=1&q=2")
                .header(header::HOST, "example.com:8080")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html;charset=UTF-8"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let root = parse_element(std::str::from_utf8(&body).unwrap()).unwrap();
    assert_eq!(root.name, "x-data");

    let context = root.child("x-context").unwrap();
    assert_eq!(context.child("server-name").unwrap().text(), "example.com");
    assert_eq!(context.child("server-port").unwrap().text(), "8080");
    assert_eq!(context.child("web-context").unwrap().text(), "/app");
    assert_eq!(context.child("path").unwrap().text(), "/home");

    let session = root.child("x-session").unwrap();
    assert_eq!(session.attribute("session-id"), Some("abc123"));

    let params: Vec<String> = root
        .child("x-request")
        .unwrap()
        .child_elements()
        .map(|p| format!("{}={}", p.attribute("key").unwrap_or_default(), p.text()))
        .collect();
    assert_eq!(params, vec!["q=1", "q=2"]);
    assert!(root.child("x-messages").is_none());
    assert!(root.child("x-errors").is_none());
}

#[tokio::test]
async fn test_no_session_block_without_session() {
    let (_, body) = get_body(app(None), "/app/home", None).await;
    let root = parse_element(&body).unwrap();
    assert!(root.child("x-session").is_none());
    assert!(root.child("x-msg").is_some());
}

#[tokio::test]
async fn test_session_alert_rendered_at_most_once() {
    let session = Arc::new(MemorySession::new("s1"));
    WebHelper::new().save_message(session.as_ref(), MessageResolvable::new("saved"));

    let (_, first) = get_body(app(Some(session.clone())), "/app/home", Some("en")).await;
    let root = parse_element(&first).unwrap();
    assert_eq!(
        root.child("x-messages").unwrap().child("msg").unwrap().text(),
        "Saved."
    );

    let (_, second) = get_body(app(Some(session)), "/app/home", Some("en")).await;
    let root = parse_element(&second).unwrap();
    assert!(root.child("x-messages").is_none());
    assert!(root.child("x-errors").is_none());
}

async fn redirect_location(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.unwrap();
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    (response.status(), location)
}

#[tokio::test]
async fn test_redirect_alert_shown_once() {
    let session = Arc::new(MemorySession::new("s1"));
    let router = app(Some(session.clone()));

    let (status, location) = redirect_location(
        router.clone(),
        Request::builder()
            .method("POST")
            .uri("/app/save")
            .header(header::HOST, "example.com:8080")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location, "/app/home?id=7");

    let (_, first) = get_body(router.clone(), &location, Some("en")).await;
    let root = parse_element(&first).unwrap();
    assert_eq!(
        root.child("x-messages").unwrap().child("msg").unwrap().text(),
        "Saved."
    );

    let (_, second) = get_body(router, &location, Some("en")).await;
    let root = parse_element(&second).unwrap();
    assert!(root.child("x-messages").is_none());
}

#[tokio::test]
async fn test_error_alert_redirect() {
    let session = Arc::new(MemorySession::new("s1"));
    let router = app(Some(session.clone()));

    let (status, location) = redirect_location(
        router.clone(),
        Request::builder()
            .uri("/app/account?tab=2")
            .header(header::HOST, "example.com:8080")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location, "/app/home");
    assert_eq!(
        WebHelper::new().saved_request_url(session.as_ref()).as_deref(),
        Some("http://example.com:8080/app/account?tab=2")
    );

    let (_, body) = get_body(router.clone(), &location, Some("en")).await;
    let root = parse_element(&body).unwrap();
    assert_eq!(
        root.child("x-messages").unwrap().child("msg").unwrap().text(),
        "Please log in."
    );
    let (_, body) = get_body(router, &location, Some("en")).await;
    assert!(parse_element(&body).unwrap().child("x-messages").is_none());
}

#[tokio::test]
async fn test_request_alert_and_field_errors() {
    let (_, body) = get_body(app(None), "/app/home?welcome=1&invalid=1", Some("en-US")).await;
    let root = parse_element(&body).unwrap();
    assert_eq!(
        root.child("x-messages").unwrap().child("msg").unwrap().text(),
        "Welcome Ann."
    );
    let errors: Vec<_> = root.child("x-errors").unwrap().child_elements().collect();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].attribute("field"), None);
    assert_eq!(errors[0].text(), "Welcome Ann.");
    assert_eq!(errors[1].attribute("field"), Some("login"));
    assert_eq!(errors[1].text(), "Login is required.");
}

#[tokio::test]
async fn test_locale_from_header_and_fallback() {
    let session = Arc::new(MemorySession::new("s1"));
    WebHelper::new().save_message(session.as_ref(), MessageResolvable::new("saved"));
    let (_, body) = get_body(app(Some(session)), "/app/home", Some("fr-FR,fr;q=0.9")).await;
    let root = parse_element(&body).unwrap();
    let context = root.child("x-context").unwrap();
    assert_eq!(context.child("user-locale").unwrap().text(), "fr_FR");
    assert_eq!(
        root.child("x-messages").unwrap().child("msg").unwrap().text(),
        "Enregistré."
    );

    let ctx = view_context(ViewConfig {
        default_locale: Some("fr".to_string()),
        ..ViewConfig::default()
    });
    let router = app_with(
        ctx,
        Arc::new(IdentityTransform),
        None,
        StatusResolverConfig::default(),
    );
    let (status, body) = get_body(router, "/app/home", None).await;
    assert_eq!(status, StatusCode::OK);
    let root = parse_element(&body).unwrap();
    assert_eq!(
        root.child("x-context").unwrap().child("user-locale").unwrap().text(),
        "fr"
    );
    let catalog: Vec<_> = root.child("x-msg").unwrap().child_elements().collect();
    assert!(catalog
        .iter()
        .any(|msg| msg.attribute("key") == Some("user.login") && msg.text() == "Identifiant"));
}

#[tokio::test]
async fn test_xml_source_bypasses_transform() {
    let transform = Arc::new(CountingTransform::default());
    let router = app_with(
        view_context(ViewConfig::default()),
        transform.clone(),
        None,
        StatusResolverConfig::default(),
    );

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/app/home?xml=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/xml;charset=UTF-8"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let root = parse_element(std::str::from_utf8(&body).unwrap()).unwrap();
    let sections: Vec<_> = root.child_elements().map(|c| c.name.as_str()).collect();
    assert_eq!(
        sections,
        vec!["x-model", "x-context", "x-request", "x-request-headers", "x-msg"]
    );
    assert_eq!(transform.calls.load(Ordering::SeqCst), 0);

    let (status, _) = get_body(router, "/app/home?xml=false", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(transform.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_model_round_trip() {
    let (_, body) = get_body(app(None), "/app/home?xml=true&name=Zo%C3%AB%20%26%20co", None).await;
    let root = parse_element(&body).unwrap();
    let user = root.child("x-model").unwrap().child("user").unwrap();
    assert_eq!(user.namespace.as_deref(), Some(APP_NS));
    assert_eq!(user.child("login").unwrap().text(), "Zoë & co");
}

#[tokio::test]
async fn test_service_view() {
    let session = Arc::new(MemorySession::new("s1"));
    let router = app_with(
        view_context(ViewConfig::service()),
        Arc::new(IdentityTransform),
        Some(session),
        StatusResolverConfig::default(),
    );
    let (_, body) = get_body(router, "/app/home", None).await;
    let root = parse_element(&body).unwrap();
    assert!(root.child("x-session").is_none());
    assert!(root.child("x-msg").is_none());
    assert!(root.child("x-model").unwrap().child("user").is_some());
}

#[tokio::test]
async fn test_marshal_error_status() {
    let mut status = StatusResolverConfig::default();
    status.mappings.insert("marshal".to_string(), 422);
    let router = app_with(
        view_context(ViewConfig {
            ignore_marshal_errors: false,
            ..ViewConfig::default()
        }),
        Arc::new(IdentityTransform),
        None,
        status,
    );
    let (status, _) = get_body(router.clone(), "/app/home?name=bad%01name", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get_body(router, "/app/home?name=fine", None).await;
    assert_eq!(status, StatusCode::OK);
}
