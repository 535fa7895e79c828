//! End-to-end flows through the router with an in-memory database, a
//! throwaway upload directory and a canned reputation lookup.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use ragguard_api::storage::Storage;
use ragguard_api::{AppStateInner, auth::bootstrap_admin, router};
use ragguard_db::Database;
use ragguard_scan::{
    ReputationLookup, ScanError, ScanOutcome, ScanSubject, UnconfiguredLookup,
};
use ragguard_types::models::Verdict;

const SECRET: &str = "integration-test-secret";
const BOUNDARY: &str = "ragguard-test-boundary";
const ADMIN_EMAIL: &str = "admin@college.edu";
const ADMIN_PASSWORD: &str = "admin-password";

struct FixedVerdict(Verdict);

#[async_trait]
impl ReputationLookup for FixedVerdict {
    async fn scan(&self, subject: ScanSubject<'_>) -> Result<ScanOutcome, ScanError> {
        Ok(ScanOutcome {
            verdict: self.0,
            report_link: format!("https://www.virustotal.com/gui/file/{}", subject.sha256),
            details: Some("0/70 engines flagged this file".into()),
        })
    }
}

struct TestApp {
    router: Router,
    upload_dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

async fn app_with(scanner: Arc<dyn ReputationLookup>) -> TestApp {
    let db = Database::open_in_memory().unwrap();
    bootstrap_admin(&db, ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();

    let upload_dir = std::env::temp_dir().join(format!("ragguard_flow_{}", uuid::Uuid::new_v4()));
    let storage = Storage::new(upload_dir.clone()).await.unwrap();

    let state = Arc::new(AppStateInner {
        db,
        jwt_secret: SECRET.into(),
        storage,
        scanner,
    });

    TestApp {
        router: router(state),
        upload_dir,
    }
}

async fn app(verdict: Verdict) -> TestApp {
    app_with(Arc::new(FixedVerdict(verdict))).await
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::builder().uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    async fn patch_status(&self, id: &str, token: &str, status: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("PATCH")
            .uri(format!("/api/complaints/update-status/{id}"))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(json!({ "status": status }).to_string()))
            .unwrap();
        self.send(req).await
    }

    async fn submit(&self, token: &str, form: &Form) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/api/complaints/submit-complaint")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(form.encode()))
            .unwrap();
        self.send(req).await
    }

    async fn register(&self, email: &str) {
        let (status, body) = self
            .post_json(
                "/api/auth/register",
                None,
                json!({
                    "name": "Test Student",
                    "email": email,
                    "password": "student-password",
                    "role": "student",
                    "studentId": "CS-042",
                    "department": "Computer Science",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    async fn login(&self, email: &str, password: &str, is_admin: bool) -> (StatusCode, Value) {
        self.post_json(
            "/api/auth/login",
            None,
            json!({ "email": email, "password": password, "isAdmin": is_admin }),
        )
        .await
    }

    async fn student(&self, email: &str) -> String {
        self.register(email).await;
        let (status, body) = self.login(email, "student-password", false).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn admin(&self) -> String {
        let (status, body) = self.login(ADMIN_EMAIL, ADMIN_PASSWORD, true).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    fn stored_files(&self) -> usize {
        std::fs::read_dir(&self.upload_dir).unwrap().count()
    }
}

/// Hand-built multipart body.
#[derive(Default)]
struct Form {
    fields: Vec<(String, String)>,
    file: Option<(String, Vec<u8>)>,
}

impl Form {
    fn complaint() -> Self {
        Self::default()
            .text("subject", "Forced to run errands")
            .text("description", "Second-year students made us clean their rooms at night")
            .text("date", "2024-08-14")
            .text("location", "Hostel B")
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    fn file(mut self, name: &str, data: Vec<u8>) -> Self {
        self.file = Some((name.into(), data));
        self
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, value) in &self.fields {
            out.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, data)) = &self.file {
            out.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            out.extend_from_slice(data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        out
    }
}

fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut data = b"%PDF-1.4\n%statement\n".to_vec();
    data.resize(len.max(data.len()), b' ');
    data
}

#[tokio::test]
async fn health_check() {
    let app = app(Verdict::Clean).await;
    let (status, body) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn register_and_login() {
    let app = app(Verdict::Clean).await;
    app.register("asha@college.edu").await;

    let (status, body) = app
        .post_json(
            "/api/auth/register",
            None,
            json!({
                "name": "Someone Else",
                "email": "ASHA@college.edu",
                "password": "another-password",
                "role": "faculty",
                "department": "Physics",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists!");

    let (status, _) = app.login("asha@college.edu", "wrong-password", false).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.login("asha@college.edu", "student-password", true).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.login("asha@college.edu", "student-password", false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["studentId"], "CS-042");
    assert_eq!(body["user"]["isAdmin"], false);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_for_one_email() {
    let app = app(Verdict::Clean).await;
    let body = json!({
        "name": "Asha Verma",
        "email": "asha@college.edu",
        "password": "student-password",
        "role": "student",
        "studentId": "CS-042",
        "department": "Computer Science",
    })
    .to_string();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let router = app.router.clone();
            let req = Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.clone()))
                .unwrap();
            tokio::spawn(async move { router.oneshot(req).await.unwrap().status() })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }

    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let conflicts = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!(created, 1, "{statuses:?}");
    assert_eq!(conflicts, statuses.len() - 1, "{statuses:?}");
}

#[tokio::test]
async fn registration_reports_every_bad_field() {
    let app = app(Verdict::Clean).await;
    let (status, body) = app
        .post_json(
            "/api/auth/register",
            None,
            json!({
                "name": "",
                "email": "not-an-email",
                "password": "short",
                "role": "student",
                "department": "",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    for field in ["name", "email", "password", "studentId", "department"] {
        assert!(body["errors"][field].is_string(), "missing {field}: {body}");
    }
}

#[tokio::test]
async fn complaint_without_attachment() {
    let app = app(Verdict::Clean).await;
    let token = app.student("asha@college.edu").await;

    let (status, body) = app.submit(&token, &Form::complaint()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["complaint"]["status"], "pending");
    assert_eq!(body["complaint"]["date"], "2024-08-14");
    assert_eq!(body["complaint"]["name"], "Test Student");
    assert!(body["complaint"]["filePath"].is_null());
    assert!(body["scan"].is_null());

    let (_, scans) = app.get("/api/scans/all", Some(&app.admin().await)).await;
    assert_eq!(scans.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn clean_pdf_is_stored_and_reported() {
    let app = app(Verdict::Clean).await;
    let token = app.student("asha@college.edu").await;

    let form = Form::complaint().file("my statement.pdf", pdf_bytes(4096));
    let (status, body) = app.submit(&token, &form).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let complaint_id = body["complaint"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["complaint"]["fileName"], "my_statement.pdf");
    assert_eq!(body["complaint"]["filePath"], format!("{complaint_id}.pdf"));
    assert_eq!(body["scan"]["verdict"], "clean");
    assert_eq!(body["scan"]["complaintId"], complaint_id.as_str());
    assert_eq!(body["scan"]["createdAt"], body["complaint"]["createdAt"]);
    assert_eq!(
        body["scan"]["fileHash"],
        ragguard_scan::sha256_hex(&pdf_bytes(4096))
    );
    assert!(app.upload_dir.join(format!("{complaint_id}.pdf")).exists());

    let (status, detail) = app
        .get(&format!("/api/complaints/{complaint_id}"), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["scan"]["verdict"], "clean");
}

#[tokio::test]
async fn malicious_pdf_is_not_kept() {
    let app = app(Verdict::Malicious).await;
    let token = app.student("asha@college.edu").await;

    let form = Form::complaint().file("statement.pdf", pdf_bytes(1024));
    let (status, body) = app.submit(&token, &form).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["scan"]["verdict"], "malicious");
    assert!(body["complaint"]["filePath"].is_null());
    assert_eq!(body["complaint"]["fileName"], "statement.pdf");
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn rejected_uploads_create_nothing() {
    let app = app(Verdict::Clean).await;
    let token = app.student("asha@college.edu").await;

    let not_pdf = Form::complaint().file("photo.pdf", b"\x89PNG\r\n\x1a\n".to_vec());
    let (status, body) = app.submit(&token, &not_pdf).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["file"], "Only PDF files are accepted");

    let too_big = Form::complaint().file("big.pdf", pdf_bytes(6 * 1024 * 1024));
    let (status, body) = app.submit(&token, &too_big).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["file"], "File must be 5MB or smaller");

    let no_subject = Form::default()
        .text("subject", "  ")
        .text("description", "details")
        .file("statement.pdf", pdf_bytes(512));
    let (status, body) = app.submit(&token, &no_subject).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["subject"], "Subject is required");

    let (_, mine) = app.get("/api/complaints/my-complaints", Some(&token)).await;
    assert_eq!(mine.as_array().unwrap().len(), 0);
    let (_, scans) = app.get("/api/scans/all", Some(&app.admin().await)).await;
    assert_eq!(scans.as_array().unwrap().len(), 0);
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn scan_failure_rolls_back_the_submission() {
    let app = app_with(Arc::new(UnconfiguredLookup)).await;
    let token = app.student("asha@college.edu").await;

    let form = Form::complaint().file("statement.pdf", pdf_bytes(1024));
    let (status, body) = app.submit(&token, &form).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);

    let (_, mine) = app.get("/api/complaints/my-complaints", Some(&token)).await;
    assert_eq!(mine.as_array().unwrap().len(), 0);
    assert_eq!(app.stored_files(), 0);

    // complaints without a file do not need the scanner
    let (status, _) = app.submit(&token, &Form::complaint()).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn cannot_submit_for_another_user() {
    let app = app(Verdict::Clean).await;
    let token = app.student("asha@college.edu").await;

    let form = Form::complaint().text("user_id", &uuid::Uuid::new_v4().to_string());
    let (status, _) = app.submit(&token, &form).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_moves_complaint_through_its_lifecycle() {
    let app = app(Verdict::Clean).await;
    let token = app.student("asha@college.edu").await;
    let admin = app.admin().await;

    let (_, created) = app.submit(&token, &Form::complaint()).await;
    let id = created["complaint"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.patch_status(&id, &admin, "investigating").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["complaint"]["status"], "investigating");

    let (_, detail) = app.get(&format!("/api/complaints/{id}"), Some(&token)).await;
    let before = &created["complaint"];
    let after = &detail["complaint"];
    assert_eq!(after["status"], "investigating");
    for field in ["subject", "description", "date", "location", "userId", "createdAt"] {
        assert_eq!(after[field], before[field], "{field} changed");
    }

    let (status, _) = app.patch_status(&id, &admin, "pending").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.patch_status(&id, &admin, "investigating").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["complaint"]["status"], "investigating");

    let (status, body) = app.patch_status(&id, &admin, "archived").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["status"].is_string());

    let (status, _) = app.patch_status(&id, &admin, "Resolved").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.patch_status(&id, &admin, "dismissed").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let missing = uuid::Uuid::new_v4().to_string();
    let (status, _) = app.patch_status(&missing, &admin, "investigating").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn students_only_see_their_own_complaints() {
    let app = app(Verdict::Clean).await;
    let asha = app.student("asha@college.edu").await;
    let ravi = app.student("ravi@college.edu").await;

    let (_, created) = app.submit(&asha, &Form::complaint()).await;
    let id = created["complaint"]["id"].as_str().unwrap().to_string();
    app.submit(&ravi, &Form::complaint().text("subject", "Ravi's complaint")).await;

    let (_, mine) = app.get("/api/complaints/my-complaints", Some(&asha)).await;
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["id"], id.as_str());

    let (status, _) = app.get(&format!("/api/complaints/{id}"), Some(&ravi)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&format!("/api/complaints/{id}"), Some(&app.admin().await)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_are_guarded() {
    let app = app(Verdict::Clean).await;
    let token = app.student("asha@college.edu").await;

    let (status, _) = app.get("/api/complaints", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/complaints", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for uri in ["/api/complaints", "/api/scans/all", "/api/scans/summary"] {
        let (status, _) = app.get(uri, Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn admin_listing_searches_and_sorts() {
    let app = app(Verdict::Clean).await;
    let token = app.student("asha@college.edu").await;
    let admin = app.admin().await;

    let older = Form::default()
        .text("subject", "Canteen incident")
        .text("description", "Food thrown")
        .text("date", "2024-01-10");
    let newer = Form::default()
        .text("subject", "Library incident")
        .text("description", "Books hidden")
        .text("date", "2024-03-05");
    app.submit(&token, &newer).await;
    app.submit(&token, &older).await;

    let (status, all) = app.get("/api/complaints?sort=date&order=asc", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let subjects: Vec<_> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["subject"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(subjects, ["Canteen incident", "Library incident"]);

    let (_, found) = app.get("/api/complaints?search=LIBRARY", Some(&admin)).await;
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["subject"], "Library incident");
}

#[tokio::test]
async fn scan_summary_counts_verdicts() {
    let app = app(Verdict::Warning).await;
    let token = app.student("asha@college.edu").await;
    let admin = app.admin().await;

    for _ in 0..2 {
        let form = Form::complaint().file("statement.pdf", pdf_bytes(256));
        let (status, _) = app.submit(&token, &form).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    app.submit(&token, &Form::complaint()).await;

    let (status, summary) = app.get("/api/scans/summary", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        summary,
        json!({ "clean": 0, "warning": 2, "malicious": 0, "total": 2 })
    );

    let (_, scans) = app.get("/api/scans/all", Some(&admin)).await;
    let scans = scans.as_array().unwrap();
    assert_eq!(scans.len(), 2);
    assert_eq!(scans[0]["name"], "Test Student");
    assert_eq!(scans[0]["department"], "Computer Science");
}
