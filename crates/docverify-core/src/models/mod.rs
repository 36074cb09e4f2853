//! Domain models

pub mod customer;
pub mod file;
pub mod schema;
pub mod submission;

pub use customer::{mask_mobile_number, ConsentRequest, CustomerLink, OtpVerification};
pub use file::FileCandidate;
pub use schema::{
    Collection, CollectionType, DocumentSpec, DocumentType, FileSlotSpec, FileType,
    RequirementSchema,
};
pub use submission::{AddressProof, DocumentSubmission, HouseType, IdProof};
