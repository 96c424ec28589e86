//! Request handlers for the REST API.

mod containers;
mod images;
mod registry;
mod system;
mod webhook;

pub use containers::{
    container_action, container_health, container_network, container_stats, list_containers,
};
pub use images::{
    image_details, image_history, list_images, pull_image, remove_image, search_images, tag_image,
};
pub use registry::{registry_check_login, registry_login, registry_logout, registry_push};
pub use system::{force_sync, health, list_deployments, status_summary};
pub use webhook::webhook;
