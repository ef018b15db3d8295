pub mod admin;
pub mod event;
pub mod notification;
pub mod user;
