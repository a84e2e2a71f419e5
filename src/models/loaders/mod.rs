pub mod course_registry;

pub use course_registry::{load_course_registry, save_course_registry};
