pub mod business;
pub mod category;
pub mod event;
pub mod user;
pub mod verification;

pub use business::Business;
pub use category::Category;
pub use event::{Event, EventListing, EventStatus, NewEvent};
pub use user::{NewUser, User};
pub use verification::VerificationCode;
