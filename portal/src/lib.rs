pub mod admin;
pub mod error;
pub mod identity;
pub mod maintenance;
pub mod organiser;
pub mod resolver;
pub mod session;
mod timeout;

#[cfg(test)]
mod test_support;

pub use admin::{AdminSurface, MonthOpening, RentDetail, SurfaceState, ViewMode};
pub use error::{AuthError, ManagerError};
pub use identity::{FirebaseIdentity, IdentityProvider, MemoryIdentity, ProviderError};
pub use maintenance::{ComplaintFeed, ComplaintWatcher, MaintenanceDesk};
pub use organiser::{EventFilter, OrganiserDashboard, OrganiserDesk};
pub use resolver::{Role, RoleResolver, RoleSession};
pub use session::SessionContext;
