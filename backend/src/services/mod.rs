pub mod auth;
pub mod balances;
pub mod events;
pub mod expenses;
pub mod members;
pub mod mess_groups;
