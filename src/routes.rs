// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, dashboard, student, teacher},
    state::AppState,
    utils::jwt::{
        authenticated_middleware, session_middleware, student_middleware, teacher_middleware,
    },
};

/// Assembles the main application router.
///
/// * Every request first passes `session_middleware`, which resolves the
///   caller's role (anonymous when no valid token is presented).
/// * Route groups are then gated by role: student, teacher, or any
///   authenticated user.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let page_routes = Router::new()
        .route("/", get(dashboard::landing))
        .route("/login", get(dashboard::landing))
        .merge(
            Router::new()
                .route("/dashboard", get(dashboard::dashboard))
                .layer(middleware::from_fn(authenticated_middleware)),
        );

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/password", post(auth::change_password))
        .layer(middleware::from_fn(authenticated_middleware));

    let student_routes = Router::new()
        .route("/exam", get(student::current_exam))
        .route("/exams/{id}", get(student::get_exam_questions))
        .route("/submit", post(student::submit_exam))
        .route("/scores", get(student::list_scores))
        .layer(middleware::from_fn(student_middleware));

    let teacher_routes = Router::new()
        .route("/exams", get(teacher::list_exams).post(teacher::create_exam))
        .route(
            "/exams/{id}",
            get(teacher::get_exam)
                .put(teacher::update_exam)
                .delete(teacher::delete_exam),
        )
        .route("/exams/{id}/scores", get(teacher::exam_scores))
        .route("/students", get(teacher::list_students).post(teacher::import_students))
        .route("/students/{id}", delete(teacher::delete_student))
        .layer(middleware::from_fn(teacher_middleware));

    Router::new()
        .merge(page_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api/user", user_routes)
        .nest("/api/student", student_routes)
        .nest("/api/teacher", teacher_routes)
        // Global Middleware (applied from outside in)
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
