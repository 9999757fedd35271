pub mod attributes;
pub mod entities;
pub mod schema;
pub mod services;
pub mod validation;
