pub mod models;
pub mod pomodoro;
