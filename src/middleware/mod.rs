pub mod http_logger;
pub mod json_errors;
pub mod permission;
