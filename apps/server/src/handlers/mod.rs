pub mod appointments;
pub mod barbers;
pub mod health;
pub mod schedule;
pub mod services;
