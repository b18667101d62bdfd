// ABOUTME: User accounts for Trellis
// ABOUTME: Entity types, storage layer, and the account service

pub mod manager;
pub mod storage;
pub mod types;

pub use manager::{UserError, UsersManager};
pub use storage::UserStorage;
pub use types::{User, UserCreateInput, UserUpdateInput};
