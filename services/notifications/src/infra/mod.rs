pub mod db;
pub mod http;
pub mod mail;
pub mod message_api;
pub mod queue;
pub mod telemetry;
pub mod webhook;
