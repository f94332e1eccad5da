pub mod accounts;
pub mod events;
pub mod messaging;
pub mod search;
pub mod verification;
