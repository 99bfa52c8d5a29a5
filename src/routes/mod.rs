pub mod assignments;
pub mod attendance;
pub mod auth;
pub mod batches;
pub mod complaints;
pub mod departments;
pub mod dto;
pub mod enrollments;
pub mod fees;
pub mod grades;
pub mod health;
pub mod notices;
pub mod settings;
pub mod stats;
pub mod subjects;
pub mod users;
