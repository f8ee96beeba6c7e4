//! inspection_server — REST surface for the field-inspection backend.
//!
//! Provides JWT-authenticated endpoints backed by `InspectionService`.
//! Routes:
//!   GET    /health                                    — health check (no auth)
//!   POST   /inspections/section-answers               — section aggregation write
//!   POST   /inspections/:id/question-images           — base64 image upload
//!   POST   /inspections/:id/upload-images             — multipart image upload
//!   GET    /inspections/:id/question-images           — image list (with data)
//!   GET    /inspections/:id/image-gallery             — grouped by section
//!   DELETE /inspections/:id/question-images/:imageId  — free an image slot
//!   POST   /inspections/:id/signature-image           — signature into the aggregate
//!   GET    /documents/answers/:answerId/docx          — rendered report
//!   GET    /inspections/by-schedule-type/:type        — inspector-client list
//!   GET    /inspections                               — org-scoped list
//!   GET    /inspections/:id                           — single read
//!   PUT    /inspections/:id/assign                    — reassign + email notice
//!   DELETE /inspections/:id                           — cascade delete

pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod notifier;
pub mod router;
pub mod state;
pub mod storage;
