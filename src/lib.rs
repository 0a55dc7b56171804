//! Back office for a single barbershop: clients, services, staff,
//! appointments, invoicing, attendance, reports and marketing campaigns.
//!
//! `barberia-d` serves the JSON API over either SQLite ([`db`]) or a local
//! JSON document ([`local`]); `barberia` is the command line front end built
//! on [`client`] and [`view`].

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod local;
pub mod models;
pub mod repository;
pub mod telemetry;
pub mod view;
