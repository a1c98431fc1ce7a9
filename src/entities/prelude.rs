pub use super::accounts::Entity as Accounts;
pub use super::activity_logs::Entity as ActivityLogs;
pub use super::categories::Entity as Categories;
pub use super::items::Entity as Items;
