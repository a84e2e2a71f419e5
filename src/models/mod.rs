pub mod accommodation;
pub mod course;
pub mod loaders;

pub use accommodation::{AccommodationRecord, AssessmentAdjustment, Roster};
pub use course::{Assessment, CourseConfig, CourseRegistry, CourseSummary};
pub use loaders::{load_course_registry, save_course_registry};
