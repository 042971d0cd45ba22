pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod migrations;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod runner;
pub mod seed;
pub mod version;
