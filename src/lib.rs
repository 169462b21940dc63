pub mod checks;
pub mod config;
pub mod db;
pub mod mailbox;
pub mod notifications;
pub mod web;
