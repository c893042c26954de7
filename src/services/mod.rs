pub mod collab_service;
pub mod janitor;
pub mod permission_service;
