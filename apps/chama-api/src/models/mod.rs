pub mod announcement;
pub mod chama;
pub mod contribution;
pub mod membership;
pub mod message;
pub mod profile;
pub mod transaction;
pub mod user;
