//! Database migrations for the Renva inbox service

pub use sea_orm_migration::prelude::*;

mod migration;

pub use migration::Migrator;
