// src/web/routes.rs
use crate::{
    state::AppState,
    web::{
        admin_handlers, assignment_handlers, attendance_handlers, auth_handlers, mw_admin, mw_auth,
        schedule_handlers,
    },
};
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

pub fn create_router(app_state: AppState) -> Router {
    // --- Rotas Públicas ---
    let public_routes = Router::new()
        .route("/health", get(auth_handlers::health))
        .route("/login", post(auth_handlers::handle_login))
        .route("/logout", post(auth_handlers::handle_logout));

    // --- Rotas de Admin ---
    // Exigem login E role admin
    let admin_routes = Router::new()
        .route(
            "/users",
            get(admin_handlers::list_users).post(admin_handlers::handle_create_user),
        )
        .route(
            "/courses",
            get(admin_handlers::list_courses).post(admin_handlers::create_course),
        )
        .route(
            "/rooms",
            get(admin_handlers::list_rooms).post(admin_handlers::create_room),
        )
        .route(
            "/periods",
            get(admin_handlers::list_periods).post(admin_handlers::create_period),
        )
        .route(
            "/lecturers",
            get(admin_handlers::list_lecturers).post(admin_handlers::create_lecturer),
        )
        .route(
            "/students",
            get(admin_handlers::list_students).post(admin_handlers::create_student),
        )
        .route(
            "/student-groups",
            get(admin_handlers::list_groups).post(admin_handlers::create_group),
        )
        .route(
            "/student-groups/{id}/members",
            post(admin_handlers::add_group_members),
        )
        .route("/schedules", post(schedule_handlers::create_schedule))
        .route(
            "/schedules/{id}",
            put(schedule_handlers::update_schedule).delete(schedule_handlers::delete_schedule),
        )
        .route(
            "/schedules/check-conflicts",
            post(schedule_handlers::check_conflicts),
        )
        .route(
            "/assignments/instructors",
            get(assignment_handlers::list_instructors).post(assignment_handlers::create_instructor),
        )
        .route(
            "/assignments/instructors/{id}",
            delete(assignment_handlers::delete_instructor),
        )
        .route(
            "/assignments/assistants",
            get(assignment_handlers::list_assistants).post(assignment_handlers::create_assistant),
        )
        .route(
            "/assignments/assistants/{id}",
            delete(assignment_handlers::delete_assistant),
        )
        .route(
            "/attendance/close-expired",
            post(admin_handlers::close_expired_sessions),
        )
        // mw_auth é aplicado no router pai
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_admin::require_admin,
        ));

    let schedule_routes = Router::new()
        .route("/", get(schedule_handlers::list_schedules))
        .route("/mine", get(schedule_handlers::my_schedules))
        .route("/{id}", get(schedule_handlers::get_schedule));

    let attendance_routes = Router::new()
        .route("/sessions", post(attendance_handlers::open_session))
        .route("/sessions/{id}", get(attendance_handlers::get_session))
        .route("/sessions/{id}/close", post(attendance_handlers::close_session))
        .route("/sessions/{id}/cancel", post(attendance_handlers::cancel_session))
        .route("/sessions/{id}/qr", get(attendance_handlers::session_qr))
        .route("/sessions/{id}/check-in", post(attendance_handlers::check_in))
        .route("/sessions/{id}/mark", post(attendance_handlers::mark))
        .route("/sessions/{id}/records", get(attendance_handlers::session_records))
        .route("/sessions/{id}/summary", get(attendance_handlers::session_summary))
        .route(
            "/schedules/{id}/sessions",
            get(attendance_handlers::schedule_sessions),
        )
        .route("/schedules/{id}/stats", get(attendance_handlers::schedule_stats))
        .route("/history", get(attendance_handlers::my_history));

    // --- Rotas Autenticadas ---
    // require_auth cobre tudo o que está acima neste router, incluindo /admin/*
    let authenticated_routes = Router::new()
        .route("/me", get(auth_handlers::me))
        .nest("/schedules", schedule_routes)
        .nest("/attendance", attendance_routes)
        .nest("/admin", admin_routes)
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_auth::require_auth,
        ));

    // --- Router Final ---
    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .with_state(app_state)
}
