pub mod api;
pub mod config;
pub mod db;
pub mod mailer;
pub mod models;
pub mod pipeline;
