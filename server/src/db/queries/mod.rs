pub mod categories;
pub mod channels;
pub mod messages;
pub mod servers;
pub mod users;
