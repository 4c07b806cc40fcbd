//! Deployment domain entities.

pub mod model;
pub mod route;
pub mod status;
pub mod task;

pub use model::{CreateDeployment, Deployment, DeploymentFilter, UpdateDeploymentStatus};
pub use route::GatewayRoute;
pub use status::DeploymentStatus;
pub use task::DeploymentTask;
