//! Newsletter sign-up for the Vemos Vamos site.
//!
//! Two halves: the server-side relay (`startup`, `routes`, `turnstile`,
//! `record_store`), which checks a Cloudflare Turnstile token and writes the
//! subscription to Airtable; and the client-side `widget`, which drives the
//! sign-up form against that relay.

pub mod configuration;
pub mod domain;
pub mod record_store;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod turnstile;
pub mod widget;
