pub mod adjustment;
pub mod course_ctx;
pub mod reconcile;

pub use adjustment::compute_adjustments;
pub use course_ctx::CourseCtx;
pub use reconcile::{ReconcileStats, ReconciliationEngine};
