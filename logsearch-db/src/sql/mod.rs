pub mod audit_log_events;
pub mod partition;
pub mod request_info;
