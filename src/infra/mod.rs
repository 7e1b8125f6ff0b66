pub mod cloud;
pub mod github;
pub mod spin;
