//! DeltaSync Core - Domain types and ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Folder`, `Message`, `CacheState`, sync keys and ids
//! - **Special-folder registry** - raw server names to canonical names
//! - **Port definitions** - Traits for adapters: `ITransport`, `IStore`, `IStateListener`
//! - **Configuration** - YAML configuration with validation and a builder
//!
//! # Architecture
//!
//! The domain module contains pure data and reconciliation rules with no I/O.
//! Ports define trait interfaces that adapter crates implement; the sync
//! engine in `deltasync-sync` drives them.

pub mod config;
pub mod domain;
pub mod ports;
