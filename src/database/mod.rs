pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod tenants;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryDegreeRepository;
pub use models::{Degree, DegreeInput};
pub use postgres::PgDegreeRepository;
pub use repository::{BulkResult, DegreeFilter, DegreeQuery, DegreeRepository, StoreError};
pub use tenants::{MemoryTenants, TenantDirectory};
