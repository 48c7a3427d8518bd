//! Repository functions for the domain layer.
//!
//! Repos speak domain types (`Game`, `GamePlayer`, `StoredEvent`) and
//! `DomainError`; the SeaORM adapters underneath speak entities and `DbErr`.
//! Reads are generic over any connection; mutations require a transaction.

pub mod events;
pub mod games;
pub mod players;
