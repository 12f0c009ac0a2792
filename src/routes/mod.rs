pub mod auth;
pub mod bookings;
pub mod calendar;
pub mod contact;
pub mod content;
pub mod email;
pub mod payments;
pub mod pricing;
pub mod rooms;
pub mod settings;
pub mod testimonials;
pub mod users;
