pub mod model;

pub use model::{Role, RoleSet, User, UserRef};
