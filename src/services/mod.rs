pub mod avatar;
pub mod error;
pub mod task_service;
pub mod user_service;
pub mod validation;

pub use avatar::{AvatarError, AvatarProcessor, ImageAvatarProcessor};
pub use error::{FieldErrors, ServiceError};
pub use task_service::TaskService;
pub use user_service::{LoginInput, RegisterInput, Session, UserService};
