//! Data models for the contact directory.
//!
//! `contact` holds the records the store persists and the query types the
//! repository understands; `dto` holds the service's input/output shapes.

pub mod contact;
pub mod dto;

pub use contact::{
    Contact, ContactChanges, ContactFilter, ContactPage, ListQuery, NewContact, Phone, SortKey,
    SortOrder,
};
pub use dto::{
    ContactCreateIn, ContactOut, ContactUpdateIn, ListFilter, ListOut, PageOut, PhoneIn, PhoneOut,
};
