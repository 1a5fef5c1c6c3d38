//! backstop
//!
//! Change-triggered backup and git-sync watcher for project directories.
//! A change detector counts filesystem modifications under the watched tree;
//! a per-action scheduler fires a backup (timestamped zip + JSON metadata)
//! or a git sync (mirror into a working copy, commit, push) when a change
//! threshold or a wall-clock interval is reached.

pub mod backup;
pub mod cli;
pub mod config;
pub mod events;
pub mod scheduler;
pub mod services;
pub mod shared;
pub mod sync;
pub mod watcher;
