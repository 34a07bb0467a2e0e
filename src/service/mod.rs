//! Services: resource CRUD, owned addresses/contacts, request validation.

mod attachment;
mod crud;
mod validation;
pub use attachment::{AttachmentKind, AttachmentService, Owner, ATTACHMENT_KINDS};
pub use crud::ResourceService;
pub use validation::{normalize_endereco, validate_contato, FieldRule, Format, RequestValidator};
