use super::*;
use crate::server::{
    data::task::TaskRepository,
    model::task::{Task, TaskFields},
};

mod create;
mod delete;
mod get_by_id;
mod get_paginated;
mod stats;
mod update;

fn fields(doc: Document) -> TaskFields {
    TaskFields::writable(doc)
}
