pub mod config;
pub mod down;
pub mod init;
pub mod ps;
pub mod up;
