//! Command handlers.

mod bulk;
mod save;

pub(crate) use bulk::handle_bulk;
pub(crate) use save::handle_save;
