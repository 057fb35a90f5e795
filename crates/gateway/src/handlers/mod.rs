//! API handlers module

pub mod admin_posts;
pub mod documents;
pub mod generate;
pub mod health;
pub mod knowledge;
pub mod newsletter;
pub mod posts;
pub mod proxy;
