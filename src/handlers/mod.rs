//! HTTP handlers for registry resources and their addresses/contacts.

pub mod attachment;
pub mod resource;
