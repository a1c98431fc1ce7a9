pub mod prelude;

pub mod accounts;
pub mod activity_logs;
pub mod categories;
pub mod items;
