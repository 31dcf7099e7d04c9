pub mod connections;
pub mod discovery;
pub mod health;
pub mod internal;
