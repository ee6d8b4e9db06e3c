// File: ./src/model/mod.rs
// Plain value types shared by the engines and the front end
pub mod item;
pub mod post;
pub mod theme;

pub use item::{Filter, Task, TaskId};
pub use post::Post;
pub use theme::Theme;
