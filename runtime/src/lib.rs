pub mod command;
pub mod coordinator;
mod executor;

pub mod prelude {
    pub use crate::command::{Command, command_fn};
    pub use crate::coordinator::{Coordinator, CoordinatorBuilder};
}

pub use command::{Command, FnCommand, command_fn};
pub use coordinator::{Coordinator, CoordinatorBuilder};
