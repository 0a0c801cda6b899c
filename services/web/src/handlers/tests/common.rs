use accredited_programmes::config::{
    AppConfig, AppEnvironment, CaseListConfig, FeatureFlags, ServerConfig, SessionConfig,
    TelemetryConfig,
};
use accredited_programmes::workflows::referrals::OfferingId;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use crate::auth::{ROLES_HEADER, USER_HEADER};

pub(crate) const REFERRER: &str = "REFERRER_USER";
pub(crate) const PROGRAMME_TEAM: &str = "PT_USER";
pub(crate) const PRISON_NUMBER: &str = "A1234AA";

pub(crate) fn config(features: FeatureFlags) -> AppConfig {
    AppConfig {
        environment: AppEnvironment::Test,
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        telemetry: TelemetryConfig {
            log_level: "debug".to_string(),
        },
        session: SessionConfig::default(),
        features,
        case_list: CaseListConfig { page_size: 2 },
    }
}

pub(crate) fn app() -> Router {
    crate::app(&config(FeatureFlags::default()))
}

/// A browser: one user, one session cookie, many requests against a shared router.
pub(crate) struct Client {
    router: Router,
    username: &'static str,
    roles: &'static str,
    cookie: Option<String>,
}

impl Client {
    pub(crate) fn referrer(router: &Router) -> Self {
        Self::new(router, REFERRER, "ROLE_ACP_REFERRER")
    }

    pub(crate) fn programme_team(router: &Router) -> Self {
        Self::new(router, PROGRAMME_TEAM, "ROLE_ACP_PROGRAMME_TEAM")
    }

    pub(crate) fn new(router: &Router, username: &'static str, roles: &'static str) -> Self {
        Self {
            router: router.clone(),
            username,
            roles,
            cookie: None,
        }
    }

    async fn send(&mut self, method: Method, path: &str, body: Option<String>) -> Response {
        let mut request = Request::builder()
            .method(method)
            .uri(path)
            .header(USER_HEADER, self.username)
            .header(ROLES_HEADER, self.roles);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie.as_str());
        }
        let body = match body {
            Some(form) => {
                request = request.header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                );
                Body::from(form)
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).expect("request builds"))
            .await
            .expect("router responds");

        if let Some(cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
        {
            self.cookie = Some(cookie.to_string());
        }
        response
    }

    pub(crate) async fn get(&mut self, path: &str) -> Response {
        self.send(Method::GET, path, None).await
    }

    pub(crate) async fn post(&mut self, path: &str, fields: &[(&str, &str)]) -> Response {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.send(Method::POST, path, Some(form)).await
    }

    /// GETs a page that must render, returning its view model.
    pub(crate) async fn page(&mut self, path: &str) -> Value {
        let response = self.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        json(response).await
    }
}

pub(crate) async fn json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}

/// Asserts a 303 and returns where it points.
pub(crate) fn redirected(response: &Response) -> String {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    location(response)
}

pub(crate) fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
        .to_string()
}

/// Creates a draft and returns its task-list path.
pub(crate) async fn start_draft(
    client: &mut Client,
    offering_id: OfferingId,
    prison_number: &str,
) -> String {
    let offering_id = offering_id.to_string();
    let response = client
        .post(
            "/refer/referrals",
            &[
                ("offeringId", offering_id.as_str()),
                ("prisonNumber", prison_number),
            ],
        )
        .await;
    redirected(&response)
}

/// Completes every task on a non-override draft.
pub(crate) async fn complete_tasks(client: &mut Client, task_list: &str) {
    let response = client
        .post(&format!("{task_list}/review-programme-history"), &[])
        .await;
    assert_eq!(redirected(&response), task_list);
    client
        .post(&format!("{task_list}/confirm-oasys"), &[("oasysConfirmed", "yes")])
        .await;
    client
        .post(
            &format!("{task_list}/reason"),
            &[("reason", "Needs to develop thinking skills")],
        )
        .await;
    client
        .post(
            &format!("{task_list}/additional-information"),
            &[("additionalInformation", "Keen to start")],
        )
        .await;
}

pub(crate) async fn submit_draft(client: &mut Client, task_list: &str) {
    complete_tasks(client, task_list).await;
    let response = client
        .post(&format!("{task_list}/submit"), &[("confirmation", "true")])
        .await;
    assert_eq!(redirected(&response), format!("{task_list}/complete"));
}

/// A submitted referral to the Thinking Skills offering, as its id.
pub(crate) async fn submitted_referral(router: &Router, prison_number: &str) -> String {
    let mut referrer = Client::referrer(router);
    let task_list = start_draft(
        &mut referrer,
        crate::infra::seed::THINKING_SKILLS_WHATTON,
        prison_number,
    )
    .await;
    submit_draft(&mut referrer, &task_list).await;
    task_list
        .rsplit('/')
        .next()
        .expect("referral id in path")
        .to_string()
}
