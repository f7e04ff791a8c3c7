#![doc = "bucket-mirror-core: core reconciliation logic for bucket-mirror."]

//! This crate contains everything needed to mirror an object-storage bucket into a
//! local directory, except the concrete storage client and the CLI.
//!
//! # Usage
//! Implement [`contract::ObjectStore`] for your backend, resolve a
//! [`config::MirrorConfig`], and drive a [`synchronise::Reconciler`].

pub mod config;
pub mod contract;
pub mod diff;
pub mod error;
pub mod fetch;
pub mod local;
pub mod progress;
pub mod remote;
pub mod schedule;
pub mod synchronise;

pub use error::{MirrorError, Result};
