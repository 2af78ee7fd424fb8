pub mod buffer;
pub mod capture_loop;
pub mod commands;
pub mod output;
pub mod record;
pub mod session;
