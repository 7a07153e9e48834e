pub mod input;
pub mod models;
pub mod paddle_state;
pub mod settings;
