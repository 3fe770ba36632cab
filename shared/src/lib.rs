pub mod district;
pub mod estimate;
pub mod locale;
pub mod map;
pub mod modal;
pub mod notify;
pub mod request;
pub mod rows;
pub mod timing;
pub mod validation;

pub use district::{DistrictSelect, DistrictState, SelectOption, TownsResponse};
pub use estimate::{EstimateCommand, EstimateFlow, EstimatePhase, StatusCard};
pub use modal::{ListCommand, ListPageConfig, ModalController};
pub use request::{Method, Payload, RequestError};
pub use rows::{RowPatch, SuccessPolicy};
