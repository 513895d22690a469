pub mod apps;
pub mod backup;
pub mod commands;
pub mod discover;
pub mod doctor;
pub mod engine;
pub mod error;
pub mod events;
pub mod fs_utils;
pub mod guard;
pub mod paths;
pub mod registry;
pub mod restore;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
