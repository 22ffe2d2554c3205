pub mod cascade;
pub mod community_engine;
pub mod directory;
pub mod membership;
pub mod roles;
pub mod validation;
pub mod views;
