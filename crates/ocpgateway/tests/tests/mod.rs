mod api;
mod catalog;
mod common;
