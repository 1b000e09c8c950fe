pub mod listener;
pub mod server_impl;
