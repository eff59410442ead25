mod email_handler_test;
mod profile_events_test;
mod worker_test;
