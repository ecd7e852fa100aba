// Plan, apply and destroy
pub mod declarative;

pub mod import;
pub mod schema;
pub mod show;
