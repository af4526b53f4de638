//! Business operations: each one resolves to a typed outcome after driving
//! exactly one database session.

pub mod credentials;
pub mod projects;
