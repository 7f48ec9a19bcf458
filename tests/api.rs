// tests/api.rs
// Percorre a API HTTP completa sobre uma base em memória.
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use kelas::{
    build_app,
    config::Config,
    create_session_store,
    db::create_memory_pool,
    models::ids::UserId,
    services::user_service,
    state::AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
}

struct Reply {
    status: StatusCode,
    body: Value,
    cookie: Option<String>,
}

impl TestApp {
    async fn new() -> Self {
        let pool = create_memory_pool().await.unwrap();
        let state = AppState::new(pool, Config::for_tests());

        let users: [(i64, &str, &[&str]); 5] = [
            (1, "admin", &["admin"]),
            (5106, "budi", &["lecturer"]),
            (7001, "sari", &["assistant"]),
            (9001, "ani", &["student"]),
            (9002, "tono", &["student"]),
        ];
        for (id, username, roles) in users {
            let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
            user_service::create_user(&state.db_pool, UserId(id), username, username, "rahasia", &roles, 4)
                .await
                .unwrap();
        }

        let store = create_session_store(&state).await.unwrap();
        Self {
            router: build_app(state, store),
        }
    }

    async fn send(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply { status, body, cookie }
    }

    async fn login(&self, username: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({ "username": username, "password": "rahasia" })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "login {}: {}", username, reply.body);
        reply.cookie.expect("login deve devolver cookie de sessão")
    }

    async fn post(&self, cookie: &str, uri: &str, body: Value) -> Reply {
        self.send(Method::POST, uri, Some(cookie), Some(body)).await
    }

    async fn get(&self, cookie: &str, uri: &str) -> Reply {
        self.send(Method::GET, uri, Some(cookie), None).await
    }
}

/// Cria curso, sala, período, turma com dois alunos, docente e assistente.
/// Devolve (course_id, room_id, group_id, period_id, [student ids]).
async fn seed_directory(app: &TestApp, admin: &str) -> (i64, i64, i64, i64, Vec<i64>) {
    let course = app
        .post(admin, "/admin/courses", json!({ "code": "IF201", "name": "Basis Data", "credits": 3 }))
        .await;
    assert_eq!(course.status, StatusCode::CREATED);
    let room = app
        .post(admin, "/admin/rooms", json!({ "code": "R1", "name": "Ruang 1", "capacity": 40 }))
        .await;
    let period = app
        .post(admin, "/admin/periods", json!({ "name": "2024 Ganjil", "year": 2024, "term": "ODD", "is_active": true }))
        .await;
    let group = app
        .post(admin, "/admin/student-groups", json!({ "name": "TI-3A", "semester": 3 }))
        .await;
    let lecturer = app
        .post(admin, "/admin/lecturers", json!({ "user_id": "5106", "employee_number": "198001", "name": "Budi" }))
        .await;
    assert_eq!(lecturer.status, StatusCode::CREATED, "{}", lecturer.body);

    let mut students = Vec::new();
    for (user_id, number) in [(9001, "24001"), (9002, "24002")] {
        let s = app
            .post(admin, "/admin/students", json!({ "user_id": user_id, "student_number": number, "name": number }))
            .await;
        assert_eq!(s.status, StatusCode::CREATED);
        students.push(s.body["id"].as_i64().unwrap());
    }

    let group_id = group.body["id"].as_i64().unwrap();
    let members = app
        .post(admin, &format!("/admin/student-groups/{}/members", group_id), json!({ "student_ids": students }))
        .await;
    assert_eq!(members.body["members"], 2);

    let course_id = course.body["id"].as_i64().unwrap();
    let period_id = period.body["id"].as_i64().unwrap();
    let assignment = json!({ "course_id": course_id, "academic_period_id": period_id, "user_id": 5106 });
    assert_eq!(
        app.post(admin, "/admin/assignments/instructors", assignment).await.status,
        StatusCode::CREATED
    );
    let assistant = json!({ "course_id": course_id, "academic_period_id": period_id, "user_id": "7001" });
    assert_eq!(
        app.post(admin, "/admin/assignments/assistants", assistant).await.status,
        StatusCode::CREATED
    );

    (course_id, room.body["id"].as_i64().unwrap(), group_id, period_id, students)
}

fn schedule_body(ids: &(i64, i64, i64, i64, Vec<i64>), start: &str, end: &str) -> Value {
    json!({
        "course_id": ids.0,
        "room_id": ids.1,
        "student_group_id": ids.2,
        "academic_period_id": ids.3,
        "day": "MONDAY",
        "start_time": start,
        "end_time": end
    })
}

#[tokio::test]
async fn health_and_authentication() {
    let app = TestApp::new().await;

    let health = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);

    let anonymous = app.send(Method::GET, "/me", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["error"], "unauthenticated");

    let wrong = app
        .send(Method::POST, "/login", None, Some(json!({ "username": "budi", "password": "x" })))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["error"], "invalid_credentials");

    let cookie = app.login("budi").await;
    let me = app.get(&cookie, "/me").await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["id"], 5106);
    assert_eq!(me.body["roles"], json!(["lecturer"]));
    assert!(me.body.get("password_hash").is_none());

    let forbidden = app.get(&cookie, "/admin/users").await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let logout = app.send(Method::POST, "/logout", Some(&cookie), None).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(app.get(&cookie, "/me").await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn overlapping_schedule_is_created_with_a_warning() {
    let app = TestApp::new().await;
    let admin = app.login("admin").await;
    let ids = seed_directory(&app, &admin).await;

    let first = app.post(&admin, "/admin/schedules", schedule_body(&ids, "08:00", "09:40")).await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);
    assert_eq!(first.body["schedule"]["lecturer_id"], 5106);
    assert_eq!(first.body["schedule"]["start_time"], "08:00");
    assert_eq!(first.body["conflicts"]["room"], false);

    let second = app.post(&admin, "/admin/schedules", schedule_body(&ids, "09:00", "10:00")).await;
    assert_eq!(second.status, StatusCode::CREATED);
    assert_eq!(second.body["conflicts"]["room"], true);
    assert_eq!(second.body["has_blocking_conflict"], false);

    let invalid = app.post(&admin, "/admin/schedules", schedule_body(&ids, "10:00", "09:00")).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.body["error"], "validation_error");

    let check = app
        .post(
            &admin,
            "/admin/schedules/check-conflicts",
            json!({ "room_id": ids.1, "day": "monday", "start_time": "09:30", "end_time": "09:45" }),
        )
        .await;
    assert_eq!(check.status, StatusCode::OK);
    assert_eq!(check.body["conflicts"]["room"], true);
    assert_eq!(check.body["conflicts"]["lecturer"], false);

    let by_room = app.get(&admin, &format!("/schedules?room_id={}", ids.1)).await;
    assert_eq!(by_room.body.as_array().unwrap().len(), 2);

    let lecturer = app.login("budi").await;
    let mine = app.get(&lecturer, "/schedules/mine").await;
    assert_eq!(mine.body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn attendance_session_flow() {
    let app = TestApp::new().await;
    let admin = app.login("admin").await;
    let ids = seed_directory(&app, &admin).await;
    let schedule = app.post(&admin, "/admin/schedules", schedule_body(&ids, "08:00", "09:40")).await;
    let schedule_id = schedule.body["schedule"]["id"].as_i64().unwrap();

    let open_body = json!({
        "course_schedule_id": schedule_id.to_string(),
        "type": "QR_CODE",
        "date": "2024-09-02",
        "settings": { "duration": 30, "lateThreshold": 10 }
    });

    // Aluno não pode abrir sessões
    let student = app.login("ani").await;
    let denied = app.post(&student, "/attendance/sessions", open_body.clone()).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.body["error"], "not_authorized");

    // Assistente abre; docente pode abrir por cima
    let assistant = app.login("sari").await;
    let by_assistant = app.post(&assistant, "/attendance/sessions", open_body.clone()).await;
    assert_eq!(by_assistant.status, StatusCode::CREATED, "{}", by_assistant.body);
    assert_eq!(by_assistant.body["session"]["opener_role"], "ASSISTANT");
    assert_eq!(by_assistant.body["records_initialized"], 2);

    let lecturer = app.login("budi").await;
    let opened = app.post(&lecturer, "/attendance/sessions", open_body.clone()).await;
    assert_eq!(opened.status, StatusCode::CREATED);
    assert_eq!(opened.body["session"]["opener_role"], "INSTRUCTOR");
    let session_id = opened.body["session"]["id"].as_i64().unwrap();
    let token = opened.body["qr_payload"].as_str().unwrap().to_string();

    let again = app.post(&lecturer, "/attendance/sessions", open_body).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["error"], "duplicate_active_session");

    let qr = app.get(&lecturer, &format!("/attendance/sessions/{}/qr", session_id)).await;
    assert_eq!(qr.body["payload"], token.as_str());
    assert_eq!(qr.body["legacy_payload"], format!("kelas:attendance:{}", session_id));

    // Check-in do aluno
    let bad = app
        .post(&student, &format!("/attendance/sessions/{}/check-in", session_id), json!({ "payload": "xyz" }))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.body["error"], "invalid_qr_payload");

    let ok = app
        .post(&student, &format!("/attendance/sessions/{}/check-in", session_id), json!({ "payload": token }))
        .await;
    assert_eq!(ok.status, StatusCode::OK, "{}", ok.body);
    assert_eq!(ok.body["status"], "PRESENT");
    assert_eq!(ok.body["verification_method"], "QR_CODE");

    // Marcação manual pelo assistente
    let marked = app
        .post(
            &assistant,
            &format!("/attendance/sessions/{}/mark", session_id),
            json!({ "student_id": ids.4[1], "status": "EXCUSED", "notes": "sakit" }),
        )
        .await;
    assert_eq!(marked.status, StatusCode::OK);
    assert_eq!(marked.body["verified_by"], 7001);

    let summary = app.get(&lecturer, &format!("/attendance/sessions/{}/summary", session_id)).await;
    assert_eq!(summary.body, json!({ "total": 2, "present": 1, "late": 0, "absent": 0, "excused": 1 }));

    let records = app.get(&lecturer, &format!("/attendance/sessions/{}/records", session_id)).await;
    assert_eq!(records.body.as_array().unwrap().len(), 2);
    assert_eq!(
        app.get(&student, &format!("/attendance/sessions/{}/records", session_id)).await.status,
        StatusCode::FORBIDDEN
    );

    // Cancelar só por quem abriu; fechar por staff
    let cancel = app
        .send(Method::POST, &format!("/attendance/sessions/{}/cancel", session_id), Some(&assistant), None)
        .await;
    assert_eq!(cancel.status, StatusCode::FORBIDDEN);
    let close = app
        .send(Method::POST, &format!("/attendance/sessions/{}/close", session_id), Some(&assistant), None)
        .await;
    assert_eq!(close.status, StatusCode::OK);
    assert_eq!(close.body["status"], "CLOSED");

    let late_check_in = app
        .post(&student, &format!("/attendance/sessions/{}/check-in", session_id), json!({ "payload": token }))
        .await;
    assert_eq!(late_check_in.status, StatusCode::CONFLICT);
    assert_eq!(late_check_in.body["error"], "session_not_active");

    // Estatísticas e histórico
    let stats = app.get(&lecturer, &format!("/attendance/schedules/{}/stats", schedule_id)).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["sessions"], 2);
    assert_eq!(stats.body["enrolled"], 2);
    assert_eq!(stats.body["average_attendance"], 25.0);

    let sessions = app.get(&admin, &format!("/attendance/schedules/{}/sessions", schedule_id)).await;
    assert_eq!(sessions.body.as_array().unwrap().len(), 2);

    let history = app.get(&student, "/attendance/history").await;
    assert_eq!(history.status, StatusCode::OK);
    let statuses: Vec<&str> = history
        .body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|h| h["status"].as_str())
        .collect();
    assert!(statuses.contains(&"PRESENT"));
    assert!(statuses.contains(&"ABSENT"));

    let swept = app
        .send(Method::POST, "/admin/attendance/close-expired", Some(&admin), None)
        .await;
    assert_eq!(swept.status, StatusCode::OK);
}
