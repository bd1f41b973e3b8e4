pub mod backend;
pub mod chat;
pub mod init;
pub mod list_models;
pub mod menu;
pub mod run;
pub mod validate;
