pub mod analytics;
pub mod chart;
pub mod core;
pub mod setup;
pub mod subjects;
pub mod theme;
pub mod users;
