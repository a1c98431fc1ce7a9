pub mod activity;
pub use activity::ActivityRecorder;

pub mod notifier;
pub use notifier::{ResendNotifier, ResetNotifier};

pub mod session;
pub use session::{AuthenticatedAccount, SessionIssuer};

pub mod scheduler;
pub use scheduler::{RetentionScheduler, SchedulerHandle};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AccountSummary, AuthError, AuthService, LoginResult, ResetRequestOutcome};
pub use auth_service_impl::SeaOrmAuthService;

pub mod inventory_service;
pub mod inventory_service_impl;
pub use inventory_service::{
    CategoryDto, CategoryWithItems, InventoryError, InventoryService, ItemChanges, ItemDto, NewItem,
};
pub use inventory_service_impl::SeaOrmInventoryService;

pub mod audit_service;
pub mod audit_service_impl;
pub use audit_service::{
    ActivityLogDto, AuditError, AuditService, EntityHistory, HistorySubject, LogPage, LogQuery,
};
pub use audit_service_impl::SeaOrmAuditService;
