mod auth;
mod cache;
mod follow;
mod forms;
