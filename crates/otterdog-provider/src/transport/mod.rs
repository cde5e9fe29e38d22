pub mod graphql;
pub mod rest;
pub mod webui;
