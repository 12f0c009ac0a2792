pub mod blocked_date;
pub mod booking;
pub mod content;
pub mod pricing;
pub mod room;
pub mod settings;
pub mod user;
