pub mod appointment;
pub mod audit;
pub mod enums;
pub mod intake;
pub mod page;
pub mod patient;
pub mod self_assessment;
pub mod soap_note;
pub mod therapist;

pub use appointment::*;
pub use audit::*;
pub use enums::*;
pub use intake::*;
pub use page::*;
pub use patient::*;
pub use self_assessment::*;
pub use soap_note::*;
pub use therapist::*;
