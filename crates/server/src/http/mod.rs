use axum::{Router, routing::get};
use deployment::Deployment;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{DeploymentImpl, routes};

pub fn router(deployment: DeploymentImpl) -> Router {
    let api_routes = Router::new()
        .merge(routes::workspaces::router())
        .merge(routes::projects::router())
        .merge(routes::tasks::router())
        .merge(routes::task_labels::router())
        .merge(routes::attachments::router(&deployment))
        .merge(routes::labels::router())
        .merge(routes::activities::router())
        .nest("/demo", routes::demo::router(&deployment));

    let uploads = ServeDir::new(deployment.attachments().store().root());

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
