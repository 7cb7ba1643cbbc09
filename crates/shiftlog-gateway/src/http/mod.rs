pub mod health;
pub mod logs;
pub mod response;
pub mod settings;
pub mod timer;
