//! ParkWise - Spot allocation and billing engine for a parking facility
//!
//! This library provides the engine behind the ParkWise service: spot
//! inventory, vehicle sessions, rate schedule, fee calculation and the HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
