//! Subprocess execution and external tool wrappers.

pub mod command;
pub mod tools;

pub use command::{capture, display_command, run, split_args, CommandOptions, CommandResult};
pub use tools::{
    docker_args, docker_remove_images, docker_save, generator, git_clone, npm, pip,
};
