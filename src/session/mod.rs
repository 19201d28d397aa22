pub mod machine;

pub use machine::{Advance, SessionMachine};
