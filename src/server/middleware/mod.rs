//! Request processing shared by every route.

pub mod request_log;
