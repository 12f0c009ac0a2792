pub mod credentials;
pub mod extract;
pub mod password;
pub mod token;

pub use extract::AdminUser;
