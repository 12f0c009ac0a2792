pub mod availability;
pub mod ical;
pub mod mailer;
pub mod payment;
pub mod pricing;
pub mod reviews;
