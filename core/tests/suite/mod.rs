mod auth;
mod realtime;
mod rest_backend;
