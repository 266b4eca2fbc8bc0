/// 计时状态持久化

pub mod json_state_store;

#[cfg(test)]
mod tests;

pub use json_state_store::{IStateStore, JsonStateStore};
