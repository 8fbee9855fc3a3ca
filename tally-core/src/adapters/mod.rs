//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Supabase REST client for the hosted backend
//! - DuckDB-backed local backend for demo mode
//! - Demo data seeded into the local backend

pub mod demo;
pub mod local;
pub mod supabase;

#[cfg(test)]
pub mod supabase_mock;
