use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime, Utc};
use reqwest::StatusCode;
use serde_json::json;

use detailr_api::app::{AppServices, build_app};
use detailr_auth::{Hs256SessionValidator, OrgRole, SessionClaims, UserRole};
use detailr_core::{BookingId, DetailerId, Money, OrganizationId, ProfileId, RefundId};
use detailr_infra::platform::procedures as p;
use detailr_infra::{AppConfig, InMemoryPlatform};
use detailr_marketplace::{
    Booking, BookingStatus, DetailerRecord, Organization, OrganizationMember, PaymentStatus, Profile,
    RefundRequest, RefundStatus,
};

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    platform: Arc<InMemoryPlatform>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(AppConfig::default()).await
    }

    async fn spawn_with(config: AppConfig) -> Self {
        let config = AppConfig {
            session_secret: SECRET.to_string(),
            ..config
        };
        let platform = Arc::new(InMemoryPlatform::new());
        let services = AppServices::over(config, platform.clone());

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            platform,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Seed a profile and return a session token for it.
    fn sign_in(&self, role: UserRole, email: &str) -> (ProfileId, String) {
        let id = ProfileId::new();
        self.platform.insert_profile(Profile {
            id,
            email: email.to_string(),
            full_name: None,
            role,
            created_at: Utc::now(),
        });
        (id, mint_token(id))
    }

    fn detailer_record(&self, profile_id: ProfileId, organization_id: Option<OrganizationId>) -> DetailerId {
        let id = DetailerId::new();
        self.platform.insert_detailer(DetailerRecord {
            id,
            profile_id,
            organization_id,
            pricing_model: None,
            is_active: true,
        });
        id
    }

    /// Seed an organization with a single member of `role`.
    fn organization_with(&self, name: &str, role: OrgRole, email: &str) -> (Organization, DetailerId, String) {
        let org = Organization {
            id: OrganizationId::new(),
            name: name.into(),
            slug: None,
            owner_profile_id: None,
        };
        self.platform.insert_organization(org.clone());
        let (detailer, token) = self.add_member(org.id, role, email);
        (org, detailer, token)
    }

    fn add_member(&self, organization_id: OrganizationId, role: OrgRole, email: &str) -> (DetailerId, String) {
        let (profile, token) = self.sign_in(UserRole::Detailer, email);
        let detailer = self.detailer_record(profile, Some(organization_id));
        self.platform.insert_member(OrganizationMember {
            organization_id,
            profile_id: profile,
            detailer_id: Some(detailer),
            role,
            full_name: None,
            email: Some(email.into()),
            joined_at: Utc::now(),
        });
        (detailer, token)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_token(sub: ProfileId) -> String {
    let now = Utc::now();
    let claims = SessionClaims {
        sub,
        issued_at: now - ChronoDuration::seconds(5),
        expires_at: now + ChronoDuration::minutes(10),
    };
    Hs256SessionValidator::new(SECRET)
        .sign(&claims)
        .expect("failed to sign session")
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn booking(status: BookingStatus, day: u32, start_hour: Option<u32>) -> Booking {
    Booking {
        id: BookingId::new(),
        receipt_id: None,
        status,
        payment_status: PaymentStatus::Unpaid,
        scheduled_date: NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
        scheduled_time_start: start_hour.map(|h| NaiveTime::from_hms_opt(h, 0, 0).unwrap()),
        scheduled_time_end: None,
        scheduled_start: None,
        scheduled_end: None,
        total_amount: Money::from_cents(12_000),
        service_price: Money::from_cents(10_000),
        addons_total: Money::from_cents(1_000),
        tax_amount: Money::from_cents(1_000),
        customer_id: ProfileId::new(),
        service_id: None,
        car_id: None,
        detailer_id: None,
        organization_id: None,
        team_id: None,
        address: Some("1 Main St".into()),
        created_at: Utc::now(),
        service: None,
        car: None,
        customer: None,
        detailer: None,
        team: None,
    }
}

fn location(res: &reqwest::Response) -> &str {
    res.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn api_requires_a_session() {
    let srv = TestServer::spawn().await;

    let res = client().get(srv.url("/api/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Unauthorized" }));

    // A token signed with another secret is no session at all.
    let res = client()
        .get(srv.url("/api/whoami"))
        .bearer_auth("not-a-valid-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client().get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn identity_is_derived_from_cookie_or_bearer() {
    let srv = TestServer::spawn().await;
    let (id, token) = srv.sign_in(UserRole::Detailer, "dee@example.com");

    let res = client()
        .get(srv.url("/api/whoami"))
        .header(reqwest::header::COOKIE, format!("sb-session={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["profile_id"], id.to_string());
    assert_eq!(body["role"], "detailer");

    let res = client()
        .get(srv.url("/api/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn route_guard_redirects_by_role() {
    let srv = TestServer::spawn().await;
    let (_, customer) = srv.sign_in(UserRole::Customer, "cus@example.com");
    let (_, admin) = srv.sign_in(UserRole::Admin, "adm@example.com");
    let (_, detailer) = srv.sign_in(UserRole::Detailer, "det@example.com");

    // Anonymous and customers are bounced from restricted prefixes.
    let res = client().get(srv.url("/detailer/dashboard")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&res), "/auth/login");

    let res = client()
        .get(srv.url("/detailer/dashboard"))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&res), "/auth/login");

    let res = client().get(srv.url("/admin")).bearer_auth(&detailer).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);

    // Prefix matching is per path segment.
    let res = client().get(srv.url("/administrators")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Admins pass both prefixes.
    let res = client().get(srv.url("/admin")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client()
        .get(srv.url("/detailer/dashboard"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Signed-in users are sent home from the login page; customers stay.
    let res = client().get(srv.url("/auth/login")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(location(&res), "/admin");
    let res = client().get(srv.url("/auth/login")).bearer_auth(&detailer).send().await.unwrap();
    assert_eq!(location(&res), "/detailer/dashboard");
    let res = client().get(srv.url("/auth/login")).bearer_auth(&customer).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn failed_role_lookup_is_unauthorized_but_login_stays_reachable() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.sign_in(UserRole::Admin, "adm@example.com");
    srv.platform.fail_procedure(p::GET_PROFILE);

    let res = client().get(srv.url("/admin")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&res), "/auth/login");

    let res = client().get(srv.url("/auth/login")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn customers_cannot_list_bookings() {
    let srv = TestServer::spawn().await;
    let (_, customer) = srv.sign_in(UserRole::Customer, "cus@example.com");

    let res = client()
        .get(srv.url("/api/bookings"))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Forbidden: detailer access required");
}

#[tokio::test]
async fn admin_lists_bookings_by_status_union_in_schedule_order() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.sign_in(UserRole::Admin, "adm@example.com");

    let afternoon = booking(BookingStatus::Paid, 3, Some(15));
    let morning = booking(BookingStatus::Offered, 3, Some(9));
    let earlier_day = booking(BookingStatus::Paid, 2, None);
    let cancelled = booking(BookingStatus::Cancelled, 1, Some(8));
    for b in [&afternoon, &morning, &earlier_day, &cancelled] {
        srv.platform.insert_booking(b.clone());
    }

    let res = client()
        .get(srv.url("/api/bookings?status=paid,offered"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![
            earlier_day.id.to_string(),
            morning.id.to_string(),
            afternoon.id.to_string()
        ]
    );

    let res = client()
        .get(srv.url("/api/bookings?limit=1&orderBy=scheduled_date&ascending=false"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let res = client()
        .get(srv.url("/api/bookings?status=teleported"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn solo_detailer_sees_only_assigned_bookings() {
    let srv = TestServer::spawn().await;
    let (profile, token) = srv.sign_in(UserRole::Detailer, "solo@example.com");
    let detailer = srv.detailer_record(profile, None);

    let mut mine = booking(BookingStatus::Accepted, 4, Some(10));
    mine.detailer_id = Some(detailer);
    let theirs = booking(BookingStatus::Accepted, 4, Some(11));
    srv.platform.insert_booking(mine.clone());
    srv.platform.insert_booking(theirs.clone());

    let res = client().get(srv.url("/api/bookings")).bearer_auth(&token).send().await.unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], mine.id.to_string());

    let res = client()
        .get(srv.url(&format!("/api/bookings/{}", theirs.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client()
        .get(srv.url(&format!("/api/bookings/{}", mine.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn huge_list_limit_is_capped_not_rejected() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.sign_in(UserRole::Admin, "adm@example.com");
    srv.platform.insert_booking(booking(BookingStatus::Paid, 5, Some(9)));

    let res = client()
        .get(srv.url(&format!("/api/bookings?limit={}", usize::MAX)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_booking_is_not_found() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.sign_in(UserRole::Admin, "adm@example.com");

    let res = client()
        .get(srv.url(&format!("/api/bookings/{}", BookingId::new())))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client()
        .get(srv.url("/api/bookings/not-a-uuid"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dispatcher_assigns_but_org_detailer_cannot() {
    let srv = TestServer::spawn().await;
    let org = Organization {
        id: OrganizationId::new(),
        name: "Mobile Shine".into(),
        slug: None,
        owner_profile_id: None,
    };
    srv.platform.insert_organization(org.clone());

    let join = |role: OrgRole, email: &str| {
        let (profile, token) = srv.sign_in(UserRole::Detailer, email);
        let detailer = srv.detailer_record(profile, Some(org.id));
        srv.platform.insert_member(OrganizationMember {
            organization_id: org.id,
            profile_id: profile,
            detailer_id: Some(detailer),
            role,
            full_name: None,
            email: Some(email.into()),
            joined_at: Utc::now(),
        });
        (detailer, token)
    };
    let (_, dispatcher) = join(OrgRole::Dispatcher, "dispatch@example.com");
    let (worker, worker_token) = join(OrgRole::Detailer, "worker@example.com");

    let mut job = booking(BookingStatus::Paid, 6, Some(9));
    job.organization_id = Some(org.id);
    srv.platform.insert_booking(job.clone());

    let res = client()
        .post(srv.url(&format!("/api/bookings/{}/assign", job.id)))
        .bearer_auth(&worker_token)
        .json(&json!({ "detailer_id": worker.to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(srv.platform.calls(p::ASSIGN_DETAILER_TO_BOOKING), 0);

    let res = client()
        .post(srv.url(&format!("/api/bookings/{}/assign", job.id)))
        .bearer_auth(&dispatcher)
        .json(&json!({ "detailer_id": worker.to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["detailer_id"], worker.to_string());

    // The dispatcher sees every organization booking.
    let res = client()
        .get(srv.url("/api/bookings"))
        .bearer_auth(&dispatcher)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let res = client()
        .get(srv.url("/api/organization"))
        .bearer_auth(&dispatcher)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["mode"], "organization");
    assert_eq!(body["data"]["role"], "dispatcher");
    assert_eq!(body["data"]["permissions"]["can_assign_jobs"], true);
}

#[tokio::test]
async fn repeated_idempotency_key_does_not_repeat_the_command() {
    let srv = TestServer::spawn().await;
    let (profile, token) = srv.sign_in(UserRole::Detailer, "solo@example.com");
    srv.detailer_record(profile, None);
    let offered = booking(BookingStatus::Offered, 7, Some(12));
    srv.platform.insert_booking(offered.clone());

    for _ in 0..2 {
        let res = client()
            .post(srv.url(&format!("/api/bookings/{}/accept", offered.id)))
            .bearer_auth(&token)
            .header("Idempotency-Key", "accept-once")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["data"]["status"], "accepted");
    }
    assert_eq!(srv.platform.calls(p::ACCEPT_BOOKING), 1);
}

#[tokio::test]
async fn dispatcher_cannot_assign_across_organizations() {
    let srv = TestServer::spawn().await;
    let (home, _, dispatcher) = srv.organization_with("Home Team", OrgRole::Dispatcher, "dispatch@home.example");
    let home_worker = srv.add_member(home.id, OrgRole::Detailer, "worker@home.example").0;
    let (rival, rival_worker, _) = srv.organization_with("Rival Team", OrgRole::Detailer, "worker@rival.example");

    let mut theirs = booking(BookingStatus::Paid, 9, Some(9));
    theirs.organization_id = Some(rival.id);
    let mut ours = booking(BookingStatus::Paid, 9, Some(11));
    ours.organization_id = Some(home.id);
    srv.platform.insert_booking(theirs.clone());
    srv.platform.insert_booking(ours.clone());

    let assign = |id: BookingId, detailer: DetailerId| {
        client()
            .post(srv.url(&format!("/api/bookings/{id}/assign")))
            .bearer_auth(&dispatcher)
            .json(&json!({ "detailer_id": detailer.to_string() }))
            .send()
    };

    // Another organization's booking, even with a home detailer as target.
    let res = assign(theirs.id, home_worker).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Own booking, foreign detailer.
    let res = assign(ours.id, rival_worker).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(srv.platform.calls(p::ASSIGN_DETAILER_TO_BOOKING), 0);
    assert_eq!(srv.platform.booking(theirs.id).unwrap().detailer_id, None);

    let res = assign(ours.id, home_worker).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn idempotency_key_reused_for_another_payload_is_a_conflict() {
    let srv = TestServer::spawn().await;
    let (org, _, dispatcher) = srv.organization_with("Key Team", OrgRole::Dispatcher, "dispatch@key.example");
    let first = srv.add_member(org.id, OrgRole::Detailer, "first@key.example").0;
    let second = srv.add_member(org.id, OrgRole::Detailer, "second@key.example").0;
    let mut job = booking(BookingStatus::Paid, 10, Some(9));
    job.organization_id = Some(org.id);
    srv.platform.insert_booking(job.clone());

    let assign = |detailer: DetailerId| {
        client()
            .post(srv.url(&format!("/api/bookings/{}/assign", job.id)))
            .bearer_auth(&dispatcher)
            .header("Idempotency-Key", "assign-1")
            .json(&json!({ "detailer_id": detailer.to_string() }))
            .send()
    };

    let res = assign(first).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = assign(first).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = assign(second).await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Idempotency-Key"));

    assert_eq!(srv.platform.calls(p::ASSIGN_DETAILER_TO_BOOKING), 1);
    assert_eq!(srv.platform.booking(job.id).unwrap().detailer_id, Some(first));
}

#[tokio::test]
async fn idempotency_keys_are_not_shared_between_callers() {
    let srv = TestServer::spawn().await;
    let offered = booking(BookingStatus::Offered, 11, Some(12));
    srv.platform.insert_booking(offered.clone());
    let (a, a_token) = srv.sign_in(UserRole::Detailer, "a@example.com");
    srv.detailer_record(a, None);
    let (b, b_token) = srv.sign_in(UserRole::Detailer, "b@example.com");
    srv.detailer_record(b, None);

    let accept = |token: &str| {
        client()
            .post(srv.url(&format!("/api/bookings/{}/accept", offered.id)))
            .bearer_auth(token)
            .header("Idempotency-Key", "shared-key")
            .send()
    };

    let res = accept(&a_token).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    // The second caller's command reaches the platform instead of replaying the first result.
    let _ = accept(&b_token).await.unwrap();
    assert_eq!(srv.platform.calls(p::ACCEPT_BOOKING), 2);
}

#[tokio::test]
async fn customer_cancels_own_booking_through_status_update() {
    let srv = TestServer::spawn().await;
    let (customer, token) = srv.sign_in(UserRole::Customer, "cus@example.com");
    let mut own = booking(BookingStatus::Paid, 8, Some(9));
    own.customer_id = customer;
    let other = booking(BookingStatus::Paid, 8, Some(10));
    srv.platform.insert_booking(own.clone());
    srv.platform.insert_booking(other.clone());

    let res = client()
        .post(srv.url(&format!("/api/bookings/{}/cancel", other.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client()
        .post(srv.url(&format!("/api/bookings/{}/cancel", own.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(srv.platform.calls(p::UPDATE_BOOKING_STATUS), 1);
    assert_eq!(srv.platform.booking(own.id).unwrap().status, BookingStatus::Cancelled);

    // Terminal now: a second cancel is rejected by the procedure and reported generically.
    let res = client()
        .post(srv.url(&format!("/api/bookings/{}/cancel", own.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn admin_changes_user_role_via_form_and_sees_it_on_reload() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.sign_in(UserRole::Admin, "adm@example.com");
    let (existing, _) = srv.sign_in(UserRole::Detailer, "old-hand@example.com");
    let (newcomer, _) = srv.sign_in(UserRole::Customer, "newcomer@example.com");

    let detailer_ids = |body: &serde_json::Value| -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_str().unwrap().to_string())
            .collect()
    };

    let res = client()
        .get(srv.url("/admin/users?role=detailer"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(detailer_ids(&body), vec![existing.to_string()]);

    let res = client()
        .post(srv.url(&format!("/admin/users/{newcomer}/role")))
        .bearer_auth(&admin)
        .form(&[("role", "detailer")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/admin/users");

    let res = client()
        .get(srv.url("/admin/users?role=detailer"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let ids = detailer_ids(&body);
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&newcomer.to_string()));
}

#[tokio::test]
async fn non_admin_form_post_is_redirected_to_login() {
    let srv = TestServer::spawn().await;
    let (me, detailer) = srv.sign_in(UserRole::Detailer, "det@example.com");

    let res = client()
        .post(srv.url(&format!("/admin/users/{me}/role")))
        .bearer_auth(&detailer)
        .form(&[("role", "admin")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&res), "/auth/login");
    assert_eq!(srv.platform.calls(p::UPDATE_PROFILE_ROLE), 0);
}

#[tokio::test]
async fn cross_origin_mutations_are_blocked() {
    let srv = TestServer::spawn_with(AppConfig {
        allowed_origins: vec!["https://app.example.com".into()],
        ..AppConfig::default()
    })
    .await;
    let (_, token) = srv.sign_in(UserRole::Customer, "cus@example.com");
    let url = srv.url(&format!("/api/bookings/{}/cancel", BookingId::new()));

    let res = client()
        .post(&url)
        .bearer_auth(&token)
        .header(reqwest::header::ORIGIN, "https://evil.example")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Allowed origin gets through to the handler (and a 404 for the unknown booking).
    let res = client()
        .post(&url)
        .bearer_auth(&token)
        .header(reqwest::header::ORIGIN, "https://app.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fee_preview_uses_default_standard_tier_when_unconfigured() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.sign_in(UserRole::Detailer, "det@example.com");

    let res = client()
        .get(srv.url("/api/fees/preview?amount=100.00"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["fee"], 15.0);
    assert_eq!(body["data"]["payout"], 85.0);
    assert_eq!(body["data"]["source"], "standard_default");

    let res = client()
        .get(srv.url("/api/fees/preview?amount=100.00&feePercentage=10"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["fee"], 10.0);
    assert_eq!(body["data"]["source"], "override");

    let res = client()
        .get(srv.url("/api/fees/preview?amount=abc"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refund_processing_without_payment_key_is_a_configuration_error() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.sign_in(UserRole::Admin, "adm@example.com");
    let refund = RefundRequest {
        id: RefundId::new(),
        booking_id: BookingId::new(),
        requested_by: ProfileId::new(),
        amount: Money::from_cents(4_000),
        reason: None,
        status: RefundStatus::Pending,
        created_at: Utc::now(),
    };
    srv.platform.insert_refund(refund.clone());

    let res = client()
        .get(srv.url("/api/admin/refunds"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let res = client()
        .post(srv.url(&format!("/api/admin/refunds/{}", refund.id)))
        .bearer_auth(&admin)
        .json(&json!({ "approve": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Server configuration error" }));
}

#[tokio::test]
async fn test_payment_shortcut_is_gated() {
    let srv = TestServer::spawn().await;
    let b = booking(BookingStatus::RequiresPayment, 9, None);
    srv.platform.insert_booking(b.clone());
    let path = format!("/api/test/bookings/{}/mark-paid", b.id);

    let res = client().post(srv.url(&path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let srv = TestServer::spawn_with(AppConfig {
        enable_test_payments: true,
        test_payment_secret: Some("let-me-pay".into()),
        ..AppConfig::default()
    })
    .await;
    srv.platform.insert_booking(b.clone());

    let res = client()
        .post(srv.url(&path))
        .header("x-test-payment-secret", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client()
        .post(srv.url(&path))
        .header("x-test-payment-secret", "let-me-pay")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["status"], "paid");
    assert_eq!(body["data"]["payment_status"], "paid");
}

#[tokio::test]
async fn availability_requires_fields() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.sign_in(UserRole::Customer, "cus@example.com");

    let res = client()
        .post(srv.url("/api/bookings/check-availability"))
        .bearer_auth(&token)
        .json(&json!({ "booking_date": "2025-05-10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client()
        .post(srv.url("/api/bookings/check-availability"))
        .bearer_auth(&token)
        .json(&json!({
            "booking_date": "2025-05-10",
            "booking_time_start": "10:00:00",
            "booking_lat": 40.7,
            "booking_lng": -74.0,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
}
