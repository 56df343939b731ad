mod client;
mod phone;

pub use client::{Client, ClientChanges, ClientPhone, ClientSearch, NewClient};
pub use phone::Phone;
